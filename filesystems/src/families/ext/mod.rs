// ext2/3/4 detection
// The superblock sits 1024 bytes into the volume; the feature flags decide
// which generation of the format it is.

use crate::detection::FilesystemDetector;
use crate::device_reader::ProbeReader;
use crate::families::format_uuid;
use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use umass_core::{UmassError, Usage, VolumeField, VolumeInfo};

const SUPERBLOCK_OFFSET: u64 = 1024;
const SUPERBLOCK_SIZE: usize = 1024;
const EXT_MAGIC: u16 = 0xEF53;

// Superblock field offsets
const S_LOG_BLOCK_SIZE: usize = 0x18;
const S_MAGIC: usize = 0x38;
const S_MINOR_REV_LEVEL: usize = 0x3E;
const S_REV_LEVEL: usize = 0x4C;
const S_FEATURE_COMPAT: usize = 0x5C;
const S_FEATURE_INCOMPAT: usize = 0x60;
const S_FEATURE_RO_COMPAT: usize = 0x64;
const S_UUID: usize = 0x68;
const S_VOLUME_NAME: usize = 0x78;
const S_CHECKSUM: usize = 0x3FC;

const COMPAT_HAS_JOURNAL: u32 = 0x0004;

const INCOMPAT_FILETYPE: u32 = 0x0002;
const INCOMPAT_RECOVER: u32 = 0x0004;
const INCOMPAT_JOURNAL_DEV: u32 = 0x0008;
const INCOMPAT_META_BG: u32 = 0x0010;

const RO_COMPAT_SPARSE_SUPER: u32 = 0x0001;
const RO_COMPAT_LARGE_FILE: u32 = 0x0002;
const RO_COMPAT_BTREE_DIR: u32 = 0x0004;
const RO_COMPAT_METADATA_CSUM: u32 = 0x0400;

/// Feature bits an ext3 driver understands; anything beyond means ext4.
const EXT3_INCOMPAT: u32 = INCOMPAT_FILETYPE | INCOMPAT_RECOVER | INCOMPAT_META_BG;
const EXT3_RO_COMPAT: u32 = RO_COMPAT_SPARSE_SUPER | RO_COMPAT_LARGE_FILE | RO_COMPAT_BTREE_DIR;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtVersion {
    Ext2,
    Ext3,
    Ext4,
    /// External journal device
    Jbd,
}

impl ExtVersion {
    fn from_features(compat: u32, incompat: u32, ro_compat: u32) -> Self {
        if incompat & INCOMPAT_JOURNAL_DEV != 0 {
            ExtVersion::Jbd
        } else if incompat & !EXT3_INCOMPAT != 0 || ro_compat & !EXT3_RO_COMPAT != 0 {
            ExtVersion::Ext4
        } else if compat & COMPAT_HAS_JOURNAL != 0 {
            ExtVersion::Ext3
        } else {
            ExtVersion::Ext2
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtVersion::Ext2 => "ext2",
            ExtVersion::Ext3 => "ext3",
            ExtVersion::Ext4 => "ext4",
            ExtVersion::Jbd => "jbd",
        }
    }
}

/// Superblock checksum as written with `metadata_csum`: CRC32C seeded with
/// all ones and no final inversion.
pub fn superblock_checksum(sb: &[u8]) -> u32 {
    !crc32c::crc32c(&sb[..S_CHECKSUM])
}

pub struct ExtDetector;

impl FilesystemDetector for ExtDetector {
    fn name(&self) -> &'static str {
        "ext"
    }

    fn probe(&self, reader: &mut ProbeReader<'_>) -> Result<Option<VolumeInfo>, UmassError> {
        let sb = match reader.read_at(SUPERBLOCK_OFFSET, SUPERBLOCK_SIZE)? {
            Some(sb) => sb,
            None => return Ok(None),
        };
        if LittleEndian::read_u16(&sb[S_MAGIC..]) != EXT_MAGIC {
            return Ok(None);
        }
        if LittleEndian::read_u32(&sb[S_LOG_BLOCK_SIZE..]) > 6 {
            debug!("ext magic present but block size is implausible");
            return Ok(None);
        }

        let compat = LittleEndian::read_u32(&sb[S_FEATURE_COMPAT..]);
        let incompat = LittleEndian::read_u32(&sb[S_FEATURE_INCOMPAT..]);
        let ro_compat = LittleEndian::read_u32(&sb[S_FEATURE_RO_COMPAT..]);

        if ro_compat & RO_COMPAT_METADATA_CSUM != 0 {
            let stored = LittleEndian::read_u32(&sb[S_CHECKSUM..]);
            if stored != superblock_checksum(&sb) {
                debug!("ext superblock checksum mismatch ({:#010x})", stored);
                return Ok(None);
            }
        }

        let version = ExtVersion::from_features(compat, incompat, ro_compat);
        let usage = match version {
            ExtVersion::Jbd => Usage::Other,
            _ => Usage::Filesystem,
        };
        let revision = format!(
            "{}.{}",
            LittleEndian::read_u32(&sb[S_REV_LEVEL..]),
            LittleEndian::read_u16(&sb[S_MINOR_REV_LEVEL..])
        );

        Ok(Some(
            VolumeInfo::new(version.as_str(), usage)
                .with_label(VolumeField::from_padded(&sb[S_VOLUME_NAME..S_VOLUME_NAME + 16]))
                .with_uuid(format_uuid(&sb[S_UUID..S_UUID + 16]))
                .with_version(revision),
        ))
    }
}
