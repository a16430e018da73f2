// ISO9660 detection
// The primary volume descriptor lives in sector 16 (2048-byte sectors).

use crate::detection::FilesystemDetector;
use crate::device_reader::ProbeReader;
use umass_core::{UmassError, Usage, VolumeField, VolumeInfo};

const PVD_OFFSET: u64 = 0x8000;
const PVD_SIZE: usize = 2048;
const PVD_TYPE_PRIMARY: u8 = 1;
const STANDARD_ID: &[u8; 5] = b"CD001";
const VOLUME_ID: usize = 40;
const VOLUME_ID_LEN: usize = 32;
const CREATION_DATE: usize = 813;

pub struct Iso9660Detector;

/// Build a `YYYY-MM-DD-HH-MM-SS-CC` identifier from the creation timestamp,
/// the closest thing the format has to a volume UUID.
fn uuid_from_creation_date(date: &[u8]) -> VolumeField {
    let digits = &date[..16];
    if !digits.iter().all(u8::is_ascii_digit) || digits.iter().all(|&b| b == b'0') {
        return VolumeField::empty();
    }
    let d = String::from_utf8_lossy(digits);
    VolumeField::from(format!(
        "{}-{}-{}-{}-{}-{}-{}",
        &d[0..4],
        &d[4..6],
        &d[6..8],
        &d[8..10],
        &d[10..12],
        &d[12..14],
        &d[14..16]
    ))
}

impl FilesystemDetector for Iso9660Detector {
    fn name(&self) -> &'static str {
        "iso9660"
    }

    fn probe(&self, reader: &mut ProbeReader<'_>) -> Result<Option<VolumeInfo>, UmassError> {
        let pvd = match reader.read_at(PVD_OFFSET, PVD_SIZE)? {
            Some(pvd) => pvd,
            None => return Ok(None),
        };
        if pvd[0] != PVD_TYPE_PRIMARY || &pvd[1..6] != STANDARD_ID {
            return Ok(None);
        }

        Ok(Some(
            VolumeInfo::new(self.name(), Usage::Filesystem)
                .with_label(VolumeField::from_padded(&pvd[VOLUME_ID..VOLUME_ID + VOLUME_ID_LEN]))
                .with_uuid(uuid_from_creation_date(&pvd[CREATION_DATE..CREATION_DATE + 17])),
        ))
    }
}
