// XFS detection

use crate::detection::FilesystemDetector;
use crate::device_reader::ProbeReader;
use crate::families::format_uuid;
use byteorder::{BigEndian, ByteOrder};
use umass_core::{UmassError, Usage, VolumeField, VolumeInfo};

const XFS_MAGIC: &[u8; 4] = b"XFSB";
const SB_BLOCKSIZE: usize = 4;
const SB_UUID: usize = 32;
const SB_VERSIONNUM: usize = 100;
const SB_FNAME: usize = 108;
const SB_FNAME_LEN: usize = 12;
const VERSION_NUMBITS: u16 = 0x000F;

pub struct XfsDetector;

impl FilesystemDetector for XfsDetector {
    fn name(&self) -> &'static str {
        "xfs"
    }

    fn probe(&self, reader: &mut ProbeReader<'_>) -> Result<Option<VolumeInfo>, UmassError> {
        let sb = match reader.read_at(0, 512)? {
            Some(sb) => sb,
            None => return Ok(None),
        };
        if &sb[..4] != XFS_MAGIC || BigEndian::read_u32(&sb[SB_BLOCKSIZE..]) < 512 {
            return Ok(None);
        }

        let version = BigEndian::read_u16(&sb[SB_VERSIONNUM..]) & VERSION_NUMBITS;
        Ok(Some(
            VolumeInfo::new(self.name(), Usage::Filesystem)
                .with_label(VolumeField::from_padded(&sb[SB_FNAME..SB_FNAME + SB_FNAME_LEN]))
                .with_uuid(format_uuid(&sb[SB_UUID..SB_UUID + 16]))
                .with_version(version.to_string()),
        ))
    }
}
