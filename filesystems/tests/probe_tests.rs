// Probing image files through the full open/probe/close path

mod common;

use common::*;
use std::io::Cursor;
use umass_core::{UmassError, Usage};
use umass_filesystems::{detect_volume, probe_volume, ProbeReader, VolumeHandle};

#[test]
fn fat32_label_padding_is_trimmed() {
    init_logging();
    let tmp = write_image(&fat32_image(b"DATA VOL   ", None, 0x1234_ABCD));

    let handle = probe_volume(tmp.path()).unwrap();
    assert_eq!(handle.filesystem_type().unwrap().to_string(), "vfat");
    assert_eq!(handle.label().unwrap().to_string(), "DATA VOL");
    assert_eq!(handle.uuid().unwrap().to_string(), "1234-ABCD");
    assert_eq!(handle.usage(), Usage::Filesystem);
    assert!(handle.is_filesystem());
}

#[test]
fn pairs_are_reported_for_non_empty_fields() {
    let tmp = write_image(&fat32_image(b"NO NAME    ", None, 0x0000_0001));

    let handle = probe_volume(tmp.path()).unwrap();
    let keys: Vec<_> = handle.pairs().into_iter().map(|(k, _)| k).collect();
    assert!(!keys.contains(&"label"));
    assert!(keys.contains(&"uuid"));
    assert!(keys.contains(&"type"));
    assert!(keys.contains(&"usage"));
}

#[test]
fn ext4_volume() {
    let uuid = [
        0xd2, 0x4f, 0x0a, 0x39, 0x8e, 0x13, 0x4b, 0x6c, 0x92, 0x1d, 0x55, 0x6e, 0x7f, 0x80, 0x91,
        0xa2,
    ];
    let tmp = write_image(&ext4_image("usbroot", uuid));

    let info = probe_volume(tmp.path()).unwrap().close().unwrap();
    assert_eq!(info.filesystem_type.to_string(), "ext4");
    assert_eq!(info.label.to_string(), "usbroot");
    assert_eq!(info.uuid.to_string(), "d24f0a39-8e13-4b6c-921d-556e7f8091a2");
    assert_eq!(info.type_version.to_string(), "1.0");
}

#[test]
fn blank_media_is_unrecognized() {
    init_logging();
    let tmp = write_image(&vec![0u8; IMAGE_SIZE]);

    match probe_volume(tmp.path()) {
        Err(UmassError::Unrecognized(path)) => assert_eq!(path, tmp.path()),
        other => panic!("expected Unrecognized, got {:?}", other),
    }
}

#[test]
fn missing_node_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("da9");

    match probe_volume(&missing) {
        Err(UmassError::NodeOpenFailed { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected NodeOpenFailed, got {:?}", other),
    }
}

#[test]
fn directory_is_not_a_node() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        probe_volume(dir.path()),
        Err(UmassError::NodeOpenFailed { .. })
    ));
}

#[test]
fn swap_and_luks_are_not_filesystems() {
    let swap = write_image(&swap_image("swap0"));
    let handle = probe_volume(swap.path()).unwrap();
    assert_eq!(handle.filesystem_type().unwrap().to_string(), "swap");
    assert_eq!(handle.usage(), Usage::Other);
    assert!(!handle.is_filesystem());

    let luks = write_image(&luks_image("6f1c1b8e-6d3b-4a5e-9f0e-2b7d0b9c4a11"));
    let handle = probe_volume(luks.path()).unwrap();
    assert_eq!(handle.filesystem_type().unwrap().to_string(), "crypto_LUKS");
    assert_eq!(
        handle.uuid().unwrap().to_string(),
        "6f1c1b8e-6d3b-4a5e-9f0e-2b7d0b9c4a11"
    );
    assert!(!handle.is_filesystem());
}

#[test]
fn handle_probe_can_be_repeated() {
    let tmp = write_image(&fat32_image(b"FIRST      ", None, 7));
    let mut handle = VolumeHandle::open(tmp.path()).unwrap();
    assert!(handle.info().is_none());
    assert!(handle.probe().unwrap());
    assert!(handle.probe().unwrap());
    assert_eq!(handle.label().unwrap().to_string(), "FIRST");
}

#[test]
fn under_reported_size_limits_the_window() {
    let image = ext4_image("window", [0x11; 16]);

    // Superblock ends at 2048; a 1 KiB window never reaches it.
    let mut cursor = Cursor::new(image.clone());
    let mut reader = ProbeReader::new(&mut cursor, 1024);
    assert!(detect_volume(&mut reader).unwrap().is_none());

    // Unknown size: nothing is clipped.
    let mut cursor = Cursor::new(image);
    let mut reader = ProbeReader::new(&mut cursor, 0);
    let info = detect_volume(&mut reader).unwrap().unwrap();
    assert_eq!(info.label.to_string(), "window");
}

#[test]
fn truncated_image_is_unrecognized() {
    let image = ext4_image("short", [0x22; 16]);
    let tmp = write_image(&image[..1500]);
    assert!(matches!(
        probe_volume(tmp.path()),
        Err(UmassError::Unrecognized(_))
    ));
}
