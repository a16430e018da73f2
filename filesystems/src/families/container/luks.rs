use crate::detection::FilesystemDetector;
use crate::device_reader::ProbeReader;
use byteorder::{BigEndian, ByteOrder};
use umass_core::{UmassError, Usage, VolumeField, VolumeInfo};

const LUKS_MAGIC: &[u8; 6] = b"LUKS\xba\xbe";
const LUKS_VERSION: usize = 6;
const LUKS2_LABEL: usize = 24;
const LUKS2_LABEL_LEN: usize = 48;
const LUKS_UUID: usize = 168;
const LUKS_UUID_LEN: usize = 40;

/// LUKS1 and LUKS2 encrypted volume headers.
pub struct LuksDetector;

impl FilesystemDetector for LuksDetector {
    fn name(&self) -> &'static str {
        "crypto_LUKS"
    }

    fn probe(&self, reader: &mut ProbeReader<'_>) -> Result<Option<VolumeInfo>, UmassError> {
        let header = match reader.read_at(0, LUKS_UUID + LUKS_UUID_LEN)? {
            Some(header) => header,
            None => return Ok(None),
        };
        if &header[..LUKS_MAGIC.len()] != LUKS_MAGIC {
            return Ok(None);
        }

        let version = BigEndian::read_u16(&header[LUKS_VERSION..]);
        let mut info = VolumeInfo::new(self.name(), Usage::Other)
            .with_uuid(VolumeField::from_padded(
                &header[LUKS_UUID..LUKS_UUID + LUKS_UUID_LEN],
            ))
            .with_version(version.to_string());

        // Only the LUKS2 binary header carries a label.
        if version == 2 {
            info = info.with_label(VolumeField::from_padded(
                &header[LUKS2_LABEL..LUKS2_LABEL + LUKS2_LABEL_LEN],
            ));
        }
        Ok(Some(info))
    }
}
