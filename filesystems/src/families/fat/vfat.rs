// FAT12/16/32 detection from the BIOS Parameter Block
//
// Boot sector layout (shared part):
//   0x00 jump, 0x03 OEM name, 0x0B bytes/sector, 0x0D sectors/cluster,
//   0x0E reserved sectors, 0x10 FAT count, 0x11 root entries,
//   0x13 total sectors (16), 0x15 media, 0x16 sectors/FAT (16),
//   0x20 total sectors (32)
// FAT12/16 extended BPB at 0x24, FAT32 extended BPB at 0x40.

use super::MAX_ROOT_SCAN;
use crate::detection::FilesystemDetector;
use crate::device_reader::ProbeReader;
use crate::families::format_serial32;
use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use umass_core::{UmassError, Usage, VolumeField, VolumeInfo};

const NO_NAME: &[u8] = b"NO NAME";
const DIR_ENTRY_SIZE: usize = 32;
const ATTR_VOLUME_ID: u8 = 0x08;
const ATTR_DIRECTORY: u8 = 0x10;
const ATTR_LONG_NAME: u8 = 0x0F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatVariant {
    Fat12,
    Fat16,
    Fat32,
}

impl FatVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            FatVariant::Fat12 => "FAT12",
            FatVariant::Fat16 => "FAT16",
            FatVariant::Fat32 => "FAT32",
        }
    }
}

/// Parsed and sanity-checked BPB.
#[derive(Debug, Clone)]
struct FatBpb {
    variant: FatVariant,
    bytes_per_sector: u64,
    sectors_per_cluster: u64,
    reserved_sectors: u64,
    num_fats: u64,
    root_entries: u64,
    fat_size: u64,
    root_cluster: u32,
    serial: Option<u32>,
    label: VolumeField,
}

impl FatBpb {
    fn parse(bs: &[u8]) -> Option<Self> {
        if bs.len() < 512 || bs[0x1FE] != 0x55 || bs[0x1FF] != 0xAA {
            return None;
        }
        let jump_ok = (bs[0] == 0xEB && bs[2] == 0x90) || bs[0] == 0xE9;
        if !jump_ok {
            return None;
        }
        if &bs[0x03..0x0B] == b"NTFS    " || &bs[0x03..0x0B] == b"EXFAT   " {
            return None;
        }

        let media = bs[0x15];
        if media != 0xF0 && media < 0xF8 {
            return None;
        }

        let bytes_per_sector = LittleEndian::read_u16(&bs[0x0B..]) as u64;
        if !bytes_per_sector.is_power_of_two() || !(512..=4096).contains(&bytes_per_sector) {
            return None;
        }
        let sectors_per_cluster = bs[0x0D] as u64;
        if sectors_per_cluster == 0 || !sectors_per_cluster.is_power_of_two() {
            return None;
        }
        let reserved_sectors = LittleEndian::read_u16(&bs[0x0E..]) as u64;
        let num_fats = bs[0x10] as u64;
        if reserved_sectors == 0 || num_fats == 0 {
            return None;
        }

        let root_entries = LittleEndian::read_u16(&bs[0x11..]) as u64;
        let total_16 = LittleEndian::read_u16(&bs[0x13..]) as u64;
        let total_32 = LittleEndian::read_u32(&bs[0x20..]) as u64;
        let total_sectors = if total_16 != 0 { total_16 } else { total_32 };
        let fat_size_16 = LittleEndian::read_u16(&bs[0x16..]) as u64;
        let fat_size_32 = LittleEndian::read_u32(&bs[0x24..]) as u64;

        let (variant, fat_size, ext) = if fat_size_16 == 0 && fat_size_32 != 0 {
            (FatVariant::Fat32, fat_size_32, 0x40)
        } else if fat_size_16 != 0 {
            let root_dir_sectors =
                (root_entries * DIR_ENTRY_SIZE as u64).div_ceil(bytes_per_sector);
            let meta = reserved_sectors + num_fats * fat_size_16 + root_dir_sectors;
            let clusters = total_sectors.checked_sub(meta)? / sectors_per_cluster;
            let variant = if clusters < 4085 {
                FatVariant::Fat12
            } else {
                FatVariant::Fat16
            };
            (variant, fat_size_16, 0x24)
        } else {
            return None;
        };

        // Extended boot signature 0x29 (or 0x28) marks serial and label valid.
        let (serial, label) = match bs[ext + 2] {
            0x28 | 0x29 => (
                Some(LittleEndian::read_u32(&bs[ext + 3..])),
                VolumeField::from_padded(&bs[ext + 7..ext + 18]),
            ),
            _ => (None, VolumeField::empty()),
        };

        Some(Self {
            variant,
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors,
            num_fats,
            root_entries,
            fat_size,
            root_cluster: LittleEndian::read_u32(&bs[0x2C..]),
            serial,
            label,
        })
    }

    fn cluster_size(&self) -> u64 {
        self.bytes_per_sector * self.sectors_per_cluster
    }

    /// Byte range of the (start of the) root directory.
    fn root_dir(&self) -> Option<(u64, u64)> {
        let fats_end = (self.reserved_sectors + self.num_fats * self.fat_size) * self.bytes_per_sector;
        match self.variant {
            FatVariant::Fat32 => {
                let cluster = (self.root_cluster as u64).checked_sub(2)?;
                let offset = fats_end.checked_add(cluster.checked_mul(self.cluster_size())?)?;
                Some((offset, self.cluster_size().min(MAX_ROOT_SCAN)))
            }
            _ => Some((
                fats_end,
                (self.root_entries * DIR_ENTRY_SIZE as u64).min(MAX_ROOT_SCAN),
            )),
        }
    }
}

/// Label stored as a volume-ID entry in the root directory.
fn root_dir_label(dir: &[u8]) -> Option<VolumeField> {
    for entry in dir.chunks_exact(DIR_ENTRY_SIZE) {
        match entry[0] {
            0x00 => break,
            0xE5 => continue,
            _ => {}
        }
        let attr = entry[11];
        if attr & ATTR_LONG_NAME == ATTR_LONG_NAME {
            continue;
        }
        if attr & ATTR_VOLUME_ID != 0 && attr & ATTR_DIRECTORY == 0 {
            let mut name = [0u8; 11];
            name.copy_from_slice(&entry[..11]);
            // 0x05 stands in for a leading 0xE5 byte.
            if name[0] == 0x05 {
                name[0] = 0xE5;
            }
            return Some(VolumeField::from_padded(&name));
        }
    }
    None
}

fn usable_label(label: &VolumeField) -> bool {
    !label.is_empty() && label.as_bytes() != NO_NAME
}

pub struct VfatDetector;

impl FilesystemDetector for VfatDetector {
    fn name(&self) -> &'static str {
        "vfat"
    }

    fn probe(&self, reader: &mut ProbeReader<'_>) -> Result<Option<VolumeInfo>, UmassError> {
        let boot_sector = match reader.read_at(0, 512)? {
            Some(sector) => sector,
            None => return Ok(None),
        };
        let bpb = match FatBpb::parse(&boot_sector) {
            Some(bpb) => bpb,
            None => return Ok(None),
        };
        debug!("{} boot sector, cluster size {}", bpb.variant.as_str(), bpb.cluster_size());

        let mut label = None;
        if let Some((offset, len)) = bpb.root_dir() {
            if let Some(dir) = reader.read_at(offset, len as usize)? {
                label = root_dir_label(&dir).filter(usable_label);
            }
        }
        let label = label
            .or_else(|| Some(bpb.label.clone()).filter(usable_label))
            .unwrap_or_default();

        let uuid = bpb.serial.map(format_serial32).unwrap_or_default();
        Ok(Some(
            VolumeInfo::new(self.name(), Usage::Filesystem)
                .with_label(label)
                .with_uuid(uuid)
                .with_version(bpb.variant.as_str()),
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    /// FAT32 boot sector for a 64 MiB volume, 4 KiB clusters.
    pub(crate) fn fat32_boot_sector(label: &[u8; 11], serial: u32) -> Vec<u8> {
        let mut bs = vec![0u8; 512];
        bs[0..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
        bs[3..11].copy_from_slice(b"MSWIN4.1");
        bs[0x0B..0x0D].copy_from_slice(&512u16.to_le_bytes());
        bs[0x0D] = 8;
        bs[0x0E..0x10].copy_from_slice(&32u16.to_le_bytes());
        bs[0x10] = 2;
        bs[0x15] = 0xF8;
        bs[0x20..0x24].copy_from_slice(&131072u32.to_le_bytes());
        bs[0x24..0x28].copy_from_slice(&128u32.to_le_bytes());
        bs[0x2C..0x30].copy_from_slice(&2u32.to_le_bytes());
        bs[0x42] = 0x29;
        bs[0x43..0x47].copy_from_slice(&serial.to_le_bytes());
        bs[0x47..0x52].copy_from_slice(label);
        bs[0x52..0x5A].copy_from_slice(b"FAT32   ");
        bs[0x1FE] = 0x55;
        bs[0x1FF] = 0xAA;
        bs
    }

    /// FAT16 boot sector, 16 MiB, 512 root entries.
    fn fat16_boot_sector(label: &[u8; 11]) -> Vec<u8> {
        let mut bs = vec![0u8; 512];
        bs[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        bs[3..11].copy_from_slice(b"mkfs.fat");
        bs[0x0B..0x0D].copy_from_slice(&512u16.to_le_bytes());
        bs[0x0D] = 4;
        bs[0x0E..0x10].copy_from_slice(&4u16.to_le_bytes());
        bs[0x10] = 2;
        bs[0x11..0x13].copy_from_slice(&512u16.to_le_bytes());
        bs[0x15] = 0xF8;
        bs[0x16..0x18].copy_from_slice(&32u16.to_le_bytes());
        bs[0x20..0x24].copy_from_slice(&32768u32.to_le_bytes());
        bs[0x26] = 0x29;
        bs[0x27..0x2B].copy_from_slice(&0xCAFE_F00Du32.to_le_bytes());
        bs[0x2B..0x36].copy_from_slice(label);
        bs[0x36..0x3E].copy_from_slice(b"FAT16   ");
        bs[0x1FE] = 0x55;
        bs[0x1FF] = 0xAA;
        bs
    }

    fn probe(image: Vec<u8>) -> Option<VolumeInfo> {
        let size = image.len() as u64;
        let mut cursor = Cursor::new(image);
        let mut reader = ProbeReader::new(&mut cursor, size);
        VfatDetector.probe(&mut reader).unwrap()
    }

    #[test]
    fn test_fat32_boot_sector_label() {
        let mut image = fat32_boot_sector(b"DATA VOL   ", 0x1234_ABCD);
        image.resize(1024 * 1024, 0);

        let info = probe(image).unwrap();
        assert_eq!(info.filesystem_type.to_string(), "vfat");
        assert_eq!(info.type_version.to_string(), "FAT32");
        assert_eq!(info.label.to_string(), "DATA VOL");
        assert_eq!(info.uuid.to_string(), "1234-ABCD");
    }

    #[test]
    fn test_root_directory_label_wins() {
        let mut image = fat32_boot_sector(b"NO NAME    ", 1);
        image.resize(1024 * 1024, 0);
        // Root cluster 2 starts right after the FATs: (32 + 2 * 128) * 512.
        let root = (32 + 2 * 128) * 512;
        image[root..root + 11].copy_from_slice(b"HOLIDAY    ");
        image[root + 11] = ATTR_VOLUME_ID;

        let info = probe(image).unwrap();
        assert_eq!(info.label.to_string(), "HOLIDAY");
    }

    #[test]
    fn test_no_name_is_empty() {
        let mut image = fat32_boot_sector(b"NO NAME    ", 1);
        image.resize(1024 * 1024, 0);
        assert!(probe(image).unwrap().label.is_empty());
    }

    #[test]
    fn test_fat16() {
        let mut image = fat16_boot_sector(b"CAMERA     ");
        image.resize(64 * 1024, 0);

        let info = probe(image).unwrap();
        assert_eq!(info.type_version.to_string(), "FAT16");
        assert_eq!(info.label.to_string(), "CAMERA");
        assert_eq!(info.uuid.to_string(), "CAFE-F00D");
    }

    #[test]
    fn test_small_volume_is_fat12() {
        let mut bs = fat16_boot_sector(b"FLOPPY     ");
        bs[0x0D] = 1;
        bs[0x13..0x15].copy_from_slice(&2880u16.to_le_bytes());
        bs[0x20..0x24].copy_from_slice(&0u32.to_le_bytes());
        bs[0x16..0x18].copy_from_slice(&9u16.to_le_bytes());
        bs[0x11..0x13].copy_from_slice(&224u16.to_le_bytes());
        bs.resize(64 * 1024, 0);

        assert_eq!(probe(bs).unwrap().type_version.to_string(), "FAT12");
    }

    #[test]
    fn test_missing_boot_signature() {
        let mut image = fat32_boot_sector(b"DATA       ", 1);
        image[0x1FF] = 0;
        assert!(probe(image).is_none());
    }

    #[test]
    fn test_bad_geometry() {
        let mut image = fat32_boot_sector(b"DATA       ", 1);
        image[0x0D] = 3;
        assert!(probe(image).is_none());
    }

    #[test]
    fn test_deleted_and_long_name_entries_skipped() {
        let dir = {
            let mut dir = vec![0u8; 128];
            dir[0] = 0xE5;
            dir[11] = ATTR_VOLUME_ID;
            dir[32] = b'A';
            dir[32 + 11] = ATTR_LONG_NAME;
            dir[64..75].copy_from_slice(b"\x05XTRA      ");
            dir[64 + 11] = ATTR_VOLUME_ID;
            dir
        };
        let label = root_dir_label(&dir).unwrap();
        assert_eq!(label.as_bytes(), b"\xE5XTRA");
    }
}
