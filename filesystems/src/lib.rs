//! Volume identification for removable media.
//!
//! Reads the first sectors of a block device (or image file), recognises the
//! on-disk format and pulls out label, UUID, type and version.

pub mod detection;
pub mod device_reader;
pub mod families;
pub mod utils;
pub mod volume;

pub use detection::{detect_volume, detector_names, FilesystemDetector, DETECTORS};
pub use device_reader::{ProbeReader, ReadSeek};
pub use families::container::{LuksDetector, SwapDetector};
pub use families::ext::{ExtDetector, ExtVersion};
pub use families::fat::{ExFatDetector, FatVariant, VfatDetector};
pub use families::iso9660::Iso9660Detector;
pub use families::ntfs::NtfsDetector;
pub use families::xfs::XfsDetector;
pub use volume::{probe_volume, VolumeHandle};
