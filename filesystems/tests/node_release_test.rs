// Descriptor accounting around probe_volume. Kept in its own test binary so
// no other test opens files concurrently.

#![cfg(target_os = "linux")]

mod common;

use common::*;
use umass_core::UmassError;
use umass_filesystems::probe_volume;

fn open_descriptors() -> usize {
    std::fs::read_dir("/proc/self/fd")
        .expect("list /proc/self/fd")
        .count()
}

#[test]
fn nodes_are_released_after_every_outcome() {
    let blank = write_image(&vec![0u8; IMAGE_SIZE]);
    let fat = write_image(&fat32_image(b"DATA VOL   ", None, 1));
    let before = open_descriptors();

    match probe_volume(blank.path()) {
        Err(UmassError::Unrecognized(_)) => {}
        other => panic!("expected Unrecognized, got {:?}", other),
    }
    assert_eq!(open_descriptors(), before);

    let handle = probe_volume(fat.path()).unwrap();
    assert_eq!(open_descriptors(), before + 1);
    let info = handle.close().unwrap();
    assert_eq!(info.label.to_string(), "DATA VOL");
    assert_eq!(open_descriptors(), before);
}
