// exFAT detection
// The label lives in a directory entry (type 0x83) inside the root
// directory, located through the cluster heap described by the boot sector.

use super::MAX_ROOT_SCAN;
use crate::detection::FilesystemDetector;
use crate::device_reader::ProbeReader;
use crate::families::format_serial32;
use byteorder::{ByteOrder, LittleEndian};
use umass_core::{UmassError, Usage, VolumeField, VolumeInfo};

const ENTRY_SIZE: usize = 32;
const ENTRY_END: u8 = 0x00;
const ENTRY_VOLUME_LABEL: u8 = 0x83;
const MAX_LABEL_CHARS: usize = 11;

pub struct ExFatDetector;

fn label_from_root(dir: &[u8]) -> VolumeField {
    for entry in dir.chunks_exact(ENTRY_SIZE) {
        match entry[0] {
            ENTRY_END => break,
            ENTRY_VOLUME_LABEL => {
                let chars = (entry[1] as usize).min(MAX_LABEL_CHARS);
                return VolumeField::from_utf16le(&entry[2..2 + chars * 2]);
            }
            _ => {}
        }
    }
    VolumeField::empty()
}

impl FilesystemDetector for ExFatDetector {
    fn name(&self) -> &'static str {
        "exfat"
    }

    fn probe(&self, reader: &mut ProbeReader<'_>) -> Result<Option<VolumeInfo>, UmassError> {
        let bs = match reader.read_at(0, 512)? {
            Some(sector) => sector,
            None => return Ok(None),
        };
        if &bs[3..11] != b"EXFAT   " {
            return Ok(None);
        }

        let bytes_per_sector_shift = bs[0x6C] as u32;
        let sectors_per_cluster_shift = bs[0x6D] as u32;
        if !(9..=12).contains(&bytes_per_sector_shift)
            || bytes_per_sector_shift + sectors_per_cluster_shift > 25
        {
            return Ok(None);
        }

        let serial = LittleEndian::read_u32(&bs[0x64..]);
        let revision = LittleEndian::read_u16(&bs[0x68..]);
        let mut info = VolumeInfo::new(self.name(), Usage::Filesystem)
            .with_uuid(format_serial32(serial))
            .with_version(format!("{}.{}", revision >> 8, revision & 0xFF));

        let bytes_per_sector = 1u64 << bytes_per_sector_shift;
        let cluster_size = bytes_per_sector << sectors_per_cluster_shift;
        let heap_offset = LittleEndian::read_u32(&bs[0x58..]) as u64 * bytes_per_sector;
        let root_cluster = LittleEndian::read_u32(&bs[0x60..]) as u64;

        if root_cluster >= 2 {
            let root = heap_offset + (root_cluster - 2) * cluster_size;
            if let Some(dir) = reader.read_at(root, cluster_size.min(MAX_ROOT_SCAN) as usize)? {
                info = info.with_label(label_from_root(&dir));
            }
        }
        Ok(Some(info))
    }
}
