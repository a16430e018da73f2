// FreeBSD CAM device tree, read through the verbose device listing of
// camcontrol(8), which walks the transport layer with the same
// device-match requests the kernel exposes on /dev/xpt0.

pub mod devlist;

use crate::tree::{DeviceTree, RecordSession};
use log::{debug, error};
use std::path::{Path, PathBuf};
use std::process::Command;
use umass_core::UmassError;

pub use devlist::{parse_devlist, DevList};

pub struct CamDeviceTree {
    program: PathBuf,
}

impl CamDeviceTree {
    pub fn new() -> Self {
        Self::with_program("camcontrol")
    }

    pub fn with_program(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
        }
    }

    fn run_devlist(&self) -> Result<String, UmassError> {
        let output = Command::new(&self.program)
            .args(["devlist", "-v"])
            .output()
            .map_err(|e| {
                error!("Failed to run {}: {}", self.program.display(), e);
                UmassError::TreeUnavailable(format!(
                    "failed to run {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(UmassError::TreeUnavailable(if stderr.is_empty() {
                format!("{} exited with {}", self.program.display(), output.status)
            } else {
                stderr
            }));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for CamDeviceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceTree for CamDeviceTree {
    type Session = RecordSession;

    fn open(&self) -> Result<RecordSession, UmassError> {
        let listing = self.run_devlist()?;
        let devlist = parse_devlist(&listing);
        debug!(
            "device tree holds {} records{}",
            devlist.records.len(),
            if devlist.fault.is_some() { " (truncated by parse error)" } else { "" }
        );

        let session = RecordSession::new(devlist.records);
        Ok(match devlist.fault {
            Some((index, line)) => session.with_fault(index, line),
            None => session,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::matcher::DeviceTreeMatcher;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn fake_camcontrol(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("camcontrol");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_resolves_through_devlist_output() {
        let dir = TempDir::new().unwrap();
        let program = fake_camcontrol(
            &dir,
            "cat <<'OUT'\n\
scbus0 on ahcich0 bus 0:\n\
<WDC WD10EZEX 01.01A01>            at scbus0 target 0 lun 0 (ada0,pass0)\n\
scbus2 on umass-sim3 bus 3:\n\
<SanDisk Cruzer 1.26>              at scbus2 target 0 lun 0 (pass2,da7)\n\
scbus-1 on xpt0 bus 0:\n\
<>                                 at scbus-1 target -1 lun ffffffff (xpt0)\n\
OUT",
        );

        let matcher = DeviceTreeMatcher::new(CamDeviceTree::with_program(&program))
            .with_page_capacity(2);
        assert_eq!(matcher.resolve_peripheral("umass-sim", 3, "da").unwrap(), Some(7));
        assert_eq!(matcher.resolve_peripheral("umass-sim", 0, "da").unwrap(), None);
    }

    #[test]
    fn test_failing_tool_is_tree_unavailable() {
        let dir = TempDir::new().unwrap();
        let program = fake_camcontrol(
            &dir,
            "echo 'camcontrol: cannot open /dev/xpt0: Permission denied' >&2\nexit 1",
        );

        match CamDeviceTree::with_program(&program).open() {
            Err(UmassError::TreeUnavailable(msg)) => assert!(msg.contains("Permission denied")),
            other => panic!("expected TreeUnavailable, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_tool_is_tree_unavailable() {
        let tree = CamDeviceTree::with_program("/nonexistent/camcontrol");
        assert!(matches!(tree.open(), Err(UmassError::TreeUnavailable(_))));
    }
}
