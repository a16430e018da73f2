// NTFS detection
// Identifies NTFS volumes from the boot sector, then reads the $Volume
// MFT record for the label and version.

use crate::detection::FilesystemDetector;
use crate::device_reader::ProbeReader;
use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use umass_core::{UmassError, Usage, VolumeField, VolumeInfo};

const MFT_RECORD_VOLUME: u64 = 3;
const ATTR_VOLUME_NAME: u32 = 0x60;
const ATTR_VOLUME_INFORMATION: u32 = 0x70;
const ATTR_END: u32 = 0xFFFF_FFFF;

/// Formatters write 1 KiB or 4 KiB records.
const MIN_MFT_RECORD_SIZE: u64 = 256;
const MAX_MFT_RECORD_SIZE: u64 = 64 * 1024;

/// Boot sector geometry needed to locate the MFT.
#[derive(Debug, Clone, Copy)]
struct NtfsGeometry {
    bytes_per_sector: u64,
    cluster_size: u64,
    mft_lcn: u64,
    mft_record_size: u64,
    serial: u64,
}

impl NtfsGeometry {
    fn parse(boot_sector: &[u8]) -> Option<Self> {
        if boot_sector.len() < 512 {
            return None;
        }
        if boot_sector[0x1FE] != 0x55 || boot_sector[0x1FF] != 0xAA {
            return None;
        }
        if &boot_sector[0x03..0x0B] != b"NTFS    " {
            return None;
        }

        let bytes_per_sector = LittleEndian::read_u16(&boot_sector[0x0B..]) as u64;
        if !bytes_per_sector.is_power_of_two() || !(256..=4096).contains(&bytes_per_sector) {
            return None;
        }

        // Values above 0x80 encode clusters larger than 64 KiB as 2^(256-n) sectors.
        let sectors_per_cluster = match boot_sector[0x0D] {
            0 => return None,
            n if n > 0x80 => 1u64 << (256 - n as u32).min(31),
            n if n.is_power_of_two() => n as u64,
            _ => return None,
        };
        let cluster_size = bytes_per_sector * sectors_per_cluster;

        let mft_lcn = LittleEndian::read_u64(&boot_sector[0x30..]);
        if mft_lcn == 0 {
            return None;
        }

        let mft_record_size = match boot_sector[0x40] as i8 {
            n if n > 0 => (n as u64).checked_mul(cluster_size)?,
            n if n < 0 && n > -32 => 1u64 << (-(n as i32)),
            _ => return None,
        };
        if !(MIN_MFT_RECORD_SIZE..=MAX_MFT_RECORD_SIZE).contains(&mft_record_size) {
            debug!("implausible MFT record size {}", mft_record_size);
            return None;
        }

        Some(Self {
            bytes_per_sector,
            cluster_size,
            mft_lcn,
            mft_record_size,
            serial: LittleEndian::read_u64(&boot_sector[0x48..]),
        })
    }
}

/// Undo the update sequence protection on a multi-sector MFT record.
fn apply_fixups(record: &mut [u8], bytes_per_sector: usize) -> bool {
    let usa_offset = LittleEndian::read_u16(&record[0x04..]) as usize;
    let usa_count = LittleEndian::read_u16(&record[0x06..]) as usize;
    if usa_count == 0 || usa_offset + usa_count * 2 > record.len() {
        return false;
    }

    let check = [record[usa_offset], record[usa_offset + 1]];
    for i in 1..usa_count {
        let end = i * bytes_per_sector;
        if end > record.len() {
            break;
        }
        if record[end - 2..end] != check {
            return false;
        }
        let fix = usa_offset + i * 2;
        record[end - 2] = record[fix];
        record[end - 1] = record[fix + 1];
    }
    true
}

/// Resident attribute values of the $Volume record, keyed by type.
fn resident_values(record: &[u8]) -> Vec<(u32, &[u8])> {
    let mut values = Vec::new();
    let mut offset = LittleEndian::read_u16(&record[0x14..]) as usize;

    while offset + 0x18 <= record.len() {
        let attr_type = LittleEndian::read_u32(&record[offset..]);
        if attr_type == ATTR_END {
            break;
        }
        let attr_len = LittleEndian::read_u32(&record[offset + 4..]) as usize;
        if attr_len == 0 || offset + attr_len > record.len() {
            break;
        }

        if record[offset + 8] == 0 {
            let value_len = LittleEndian::read_u32(&record[offset + 0x10..]) as usize;
            let value_offset = LittleEndian::read_u16(&record[offset + 0x14..]) as usize;
            if value_offset + value_len <= attr_len {
                let start = offset + value_offset;
                values.push((attr_type, &record[start..start + value_len]));
            }
        }
        offset += attr_len;
    }
    values
}

pub struct NtfsDetector;

impl FilesystemDetector for NtfsDetector {
    fn name(&self) -> &'static str {
        "ntfs"
    }

    fn probe(&self, reader: &mut ProbeReader<'_>) -> Result<Option<VolumeInfo>, UmassError> {
        let boot_sector = match reader.read_at(0, 512)? {
            Some(sector) => sector,
            None => return Ok(None),
        };
        let geometry = match NtfsGeometry::parse(&boot_sector) {
            Some(geometry) => geometry,
            None => return Ok(None),
        };

        let mut serial = geometry.serial.to_le_bytes();
        serial.reverse();
        let mut info = VolumeInfo::new(self.name(), Usage::Filesystem)
            .with_uuid(VolumeField::from(hex::encode_upper(serial)));

        let record_offset = geometry
            .mft_lcn
            .checked_mul(geometry.cluster_size)
            .and_then(|mft| mft.checked_add(MFT_RECORD_VOLUME * geometry.mft_record_size));
        let record = match record_offset {
            Some(offset) => reader.read_at(offset, geometry.mft_record_size as usize)?,
            None => None,
        };

        match record {
            Some(mut record) if &record[..4] == b"FILE" => {
                if !apply_fixups(&mut record, geometry.bytes_per_sector as usize) {
                    debug!("$Volume record fails its update sequence check");
                    return Ok(Some(info));
                }
                for (attr_type, value) in resident_values(&record) {
                    match attr_type {
                        ATTR_VOLUME_NAME => info = info.with_label(VolumeField::from_utf16le(value)),
                        ATTR_VOLUME_INFORMATION if value.len() >= 10 => {
                            info = info.with_version(format!("{}.{}", value[8], value[9]));
                        }
                        _ => {}
                    }
                }
            }
            _ => debug!("$Volume record unavailable, reporting NTFS without label"),
        }

        Ok(Some(info))
    }
}
