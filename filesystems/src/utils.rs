// Node opening and media size queries

use log::{debug, error};
use std::fs::File;
use std::io;
use std::path::Path;
use umass_core::UmassError;

#[cfg(target_os = "freebsd")]
mod ioctls {
    // sys/disk.h: DIOCGMEDIASIZE = _IOR('d', 129, off_t)
    nix::ioctl_read!(diocgmediasize, b'd', 129, libc::off_t);
}

#[cfg(target_os = "linux")]
mod ioctls {
    // linux/fs.h: BLKGETSIZE64 = _IOR(0x12, 114, size_t)
    nix::ioctl_read!(blkgetsize64, 0x12, 114, u64);
}

/// Open a device node (or disk image) for reading.
pub fn open_node_read(path: &Path) -> Result<File, UmassError> {
    let fail = |source: io::Error| {
        error!("Failed to open {}: {}", path.display(), source);
        UmassError::NodeOpenFailed {
            path: path.to_path_buf(),
            source,
        }
    };

    let file = File::open(path).map_err(fail)?;
    let metadata = file.metadata().map_err(fail)?;
    if metadata.is_dir() {
        return Err(fail(io::Error::new(
            io::ErrorKind::Other,
            "is a directory, not a device node",
        )));
    }
    Ok(file)
}

#[cfg(target_os = "freebsd")]
fn query_media_size(file: &File) -> io::Result<u64> {
    use std::os::fd::AsRawFd;

    let mut size: libc::off_t = 0;
    unsafe { ioctls::diocgmediasize(file.as_raw_fd(), &mut size) }?;
    u64::try_from(size).map_err(|_| io::Error::from(io::ErrorKind::InvalidData))
}

#[cfg(target_os = "linux")]
fn query_media_size(file: &File) -> io::Result<u64> {
    use std::os::fd::AsRawFd;

    let mut size: u64 = 0;
    unsafe { ioctls::blkgetsize64(file.as_raw_fd(), &mut size) }?;
    Ok(size)
}

#[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
fn query_media_size(_file: &File) -> io::Result<u64> {
    Err(io::Error::from(io::ErrorKind::Unsupported))
}

/// Total addressable bytes of an open node.
///
/// Falls back to the node's reported length when the device-size query
/// fails (regular image files, unsupported platforms). 0 means unknown.
pub fn media_size(file: &File) -> u64 {
    match query_media_size(file) {
        Ok(size) if size > 0 => return size,
        Ok(_) => debug!("device size query reported 0 bytes"),
        Err(e) => debug!("device size query failed: {}", e),
    }
    file.metadata().map(|m| m.len()).unwrap_or(0)
}
