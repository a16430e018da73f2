use crate::detection::FilesystemDetector;
use crate::device_reader::ProbeReader;
use crate::families::format_uuid;
use umass_core::{UmassError, Usage, VolumeField, VolumeInfo};

const PAGE_SIZES: [u64; 4] = [4096, 8192, 16384, 65536];
const MAGIC_LEN: usize = 10;

// Version 2 header, 1 KiB into the first page
const HEADER_OFFSET: u64 = 1024;
const UUID_OFFSET: usize = 12;
const LABEL_OFFSET: usize = 28;
const LABEL_LEN: usize = 16;

/// Linux swap areas, old (`SWAP-SPACE`) and new (`SWAPSPACE2`) style.
pub struct SwapDetector;

impl FilesystemDetector for SwapDetector {
    fn name(&self) -> &'static str {
        "swap"
    }

    fn probe(&self, reader: &mut ProbeReader<'_>) -> Result<Option<VolumeInfo>, UmassError> {
        for page_size in PAGE_SIZES {
            let magic = match reader.read_at(page_size - MAGIC_LEN as u64, MAGIC_LEN)? {
                Some(magic) => magic,
                None => break,
            };

            match magic.as_slice() {
                b"SWAP-SPACE" => {
                    return Ok(Some(VolumeInfo::new(self.name(), Usage::Other).with_version("1")));
                }
                b"SWAPSPACE2" => {
                    let mut info = VolumeInfo::new(self.name(), Usage::Other).with_version("2");
                    if let Some(header) = reader.read_at(HEADER_OFFSET, LABEL_OFFSET + LABEL_LEN)? {
                        info = info
                            .with_uuid(format_uuid(&header[UUID_OFFSET..UUID_OFFSET + 16]))
                            .with_label(VolumeField::from_padded(
                                &header[LABEL_OFFSET..LABEL_OFFSET + LABEL_LEN],
                            ));
                    }
                    return Ok(Some(info));
                }
                _ => {}
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_swapspace2_with_label() {
        let mut buf = vec![0u8; 8192];
        buf[4086..4096].copy_from_slice(b"SWAPSPACE2");
        buf[1036..1052].copy_from_slice(&[
            0x3c, 0x9d, 0x1e, 0x62, 0x5a, 0x4b, 0x4c, 0x1d, 0x8d, 0x2e, 0x7f, 0x10, 0x21, 0x32,
            0x43, 0x54,
        ]);
        buf[1052..1056].copy_from_slice(b"swap");

        let mut cursor = Cursor::new(buf);
        let mut reader = ProbeReader::new(&mut cursor, 8192);
        let info = SwapDetector.probe(&mut reader).unwrap().unwrap();

        assert_eq!(info.usage, Usage::Other);
        assert_eq!(info.type_version.to_string(), "2");
        assert_eq!(info.label.to_string(), "swap");
        assert_eq!(info.uuid.to_string(), "3c9d1e62-5a4b-4c1d-8d2e-7f1021324354");
    }

    #[test]
    fn test_large_page_swap() {
        let mut buf = vec![0u8; 16384];
        buf[16374..16384].copy_from_slice(b"SWAP-SPACE");

        let mut cursor = Cursor::new(buf);
        let mut reader = ProbeReader::new(&mut cursor, 16384);
        let info = SwapDetector.probe(&mut reader).unwrap().unwrap();
        assert_eq!(info.type_version.to_string(), "1");
    }
}
