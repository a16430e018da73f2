// Synthetic volume images shared by the integration tests
#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub const IMAGE_SIZE: usize = 1024 * 1024;

/// Root directory offset of the FAT32 layout below: (reserved + 2 FATs) * 512.
pub const FAT32_ROOT: usize = (32 + 2 * 128) * 512;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// FAT32 volume (8 sectors per cluster, 32 reserved, two 128-sector FATs)
/// with the label in the boot sector and, optionally, the root directory.
pub fn fat32_image(boot_label: &[u8; 11], root_label: Option<&[u8; 11]>, serial: u32) -> Vec<u8> {
    let mut image = vec![0u8; IMAGE_SIZE];
    let bs = &mut image[..512];
    bs[0..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
    bs[3..11].copy_from_slice(b"mkfs.fat");
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
    bs[0x47..0x52].copy_from_slice(boot_label);
    bs[0x52..0x5A].copy_from_slice(b"FAT32   ");
    bs[0x1FE] = 0x55;
    bs[0x1FF] = 0xAA;
    if let Some(label) = root_label {
        set_fat_root_label(&mut image, label);
    }
    image
}

pub fn set_fat_root_label(image: &mut [u8], label: &[u8; 11]) {
    image[FAT32_ROOT..FAT32_ROOT + 11].copy_from_slice(label);
    image[FAT32_ROOT + 11] = 0x08;
}

pub fn set_fat_boot_label(image: &mut [u8], label: &[u8; 11]) {
    image[0x47..0x52].copy_from_slice(label);
}

/// ext4 superblock with `metadata_csum` and a valid checksum.
pub fn ext4_image(label: &str, uuid: [u8; 16]) -> Vec<u8> {
    let mut image = vec![0u8; IMAGE_SIZE];
    let sb = &mut image[1024..2048];
    sb[0x18..0x1C].copy_from_slice(&2u32.to_le_bytes());
    sb[0x38..0x3A].copy_from_slice(&0xEF53u16.to_le_bytes());
    sb[0x4C..0x50].copy_from_slice(&1u32.to_le_bytes());
    sb[0x5C..0x60].copy_from_slice(&0x0004u32.to_le_bytes());
    sb[0x60..0x64].copy_from_slice(&0x02C2u32.to_le_bytes());
    sb[0x64..0x68].copy_from_slice(&0x0401u32.to_le_bytes());
    sb[0x68..0x78].copy_from_slice(&uuid);
    sb[0x78..0x78 + label.len()].copy_from_slice(label.as_bytes());
    let csum = !crc32c::crc32c(&sb[..0x3FC]);
    sb[0x3FC..0x400].copy_from_slice(&csum.to_le_bytes());
    image
}

pub fn swap_image(label: &str) -> Vec<u8> {
    let mut image = vec![0u8; IMAGE_SIZE];
    image[4086..4096].copy_from_slice(b"SWAPSPACE2");
    image[1036..1052].copy_from_slice(&[0x42; 16]);
    image[1052..1052 + label.len()].copy_from_slice(label.as_bytes());
    image
}

pub fn luks_image(uuid: &str) -> Vec<u8> {
    let mut image = vec![0u8; IMAGE_SIZE];
    image[..6].copy_from_slice(b"LUKS\xba\xbe");
    image[6..8].copy_from_slice(&1u16.to_be_bytes());
    image[168..168 + uuid.len()].copy_from_slice(uuid.as_bytes());
    image
}

pub fn write_image(image: &[u8]) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("create temp image");
    tmp.write_all(image).expect("write temp image");
    tmp.flush().expect("flush temp image");
    tmp
}

pub fn rewrite_image(path: &Path, image: &[u8]) {
    std::fs::write(path, image).expect("rewrite image");
}
