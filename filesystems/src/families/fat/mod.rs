// FAT family: FAT12/16/32 and exFAT

mod exfat;
mod vfat;

pub use exfat::ExFatDetector;
pub use vfat::{FatVariant, VfatDetector};

/// Upper bound on how much of a root directory is scanned for a label.
pub(crate) const MAX_ROOT_SCAN: u64 = 64 * 1024;
