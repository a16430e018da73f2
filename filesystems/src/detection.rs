// Filesystem signature detection

use crate::device_reader::ProbeReader;
use crate::families::container::{LuksDetector, SwapDetector};
use crate::families::ext::ExtDetector;
use crate::families::fat::{ExFatDetector, VfatDetector};
use crate::families::iso9660::Iso9660Detector;
use crate::families::ntfs::NtfsDetector;
use crate::families::xfs::XfsDetector;
use log::{debug, trace};
use umass_core::{UmassError, VolumeInfo};

/// Format-specific signature check.
pub trait FilesystemDetector: Sync {
    /// Name of the format this detector recognises.
    fn name(&self) -> &'static str;

    /// Validate the on-disk signature and extract identifying metadata.
    ///
    /// # Returns
    /// - `Some(info)` if the magic numbers (and checksums, where the format
    ///   has them) validate
    /// - `None` if this is not the detector's format
    fn probe(&self, reader: &mut ProbeReader<'_>) -> Result<Option<VolumeInfo>, UmassError>;
}

/// Probe order. Formats with unambiguous magic numbers come before the
/// heuristic FAT check, containers before the filesystems they may wrap.
pub static DETECTORS: &[&dyn FilesystemDetector] = &[
    &LuksDetector,
    &SwapDetector,
    &NtfsDetector,
    &ExFatDetector,
    &VfatDetector,
    &XfsDetector,
    &ExtDetector,
    &Iso9660Detector,
];

/// Run every detector in order and return the first match.
pub fn detect_volume(reader: &mut ProbeReader<'_>) -> Result<Option<VolumeInfo>, UmassError> {
    for detector in DETECTORS {
        trace!("probing for {}", detector.name());
        if let Some(info) = detector.probe(reader)? {
            debug!(
                "detected {} (usage {}, label {:?})",
                detector.name(),
                info.usage,
                info.label
            );
            return Ok(Some(info));
        }
    }
    debug!("no known signature found");
    Ok(None)
}

/// Detector names in probe order.
pub fn detector_names() -> Vec<&'static str> {
    DETECTORS.iter().map(|d| d.name()).collect()
}
