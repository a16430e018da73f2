// On-disk format families recognised by the prober

pub mod container;
pub mod ext;
pub mod fat;
pub mod iso9660;
pub mod ntfs;
pub mod xfs;

use uuid::Uuid;
use umass_core::VolumeField;

/// Standard hyphenated form of a 16-byte on-disk UUID; all-zero means none.
pub(crate) fn format_uuid(raw: &[u8]) -> VolumeField {
    match <[u8; 16]>::try_from(raw) {
        Ok(bytes) if bytes.iter().any(|&b| b != 0) => {
            VolumeField::from(Uuid::from_bytes(bytes).hyphenated().to_string())
        }
        _ => VolumeField::empty(),
    }
}

/// `XXXX-XXXX` form of a 32-bit volume serial number.
pub(crate) fn format_serial32(serial: u32) -> VolumeField {
    VolumeField::from(format!("{:04X}-{:04X}", serial >> 16, serial & 0xFFFF))
}
