// volumeinfo output

use std::io::Write;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use umass_core::{UmassConfig, UmassError};
use umass_filesystems::probe_volume;

#[derive(Debug, Error)]
pub enum ReportFailure {
    #[error("Could not probe device")]
    Probe(#[source] UmassError),

    #[error("Not a filesystem")]
    NotFilesystem,

    #[error("cannot write output: {0}")]
    Output(#[from] std::io::Error),
}

impl ReportFailure {
    pub fn exit_code(&self) -> i32 {
        match self {
            ReportFailure::Probe(_) | ReportFailure::Output(_) => 2,
            ReportFailure::NotFilesystem => 3,
        }
    }
}

/// Node path for `special`. A bare node name such as `da0` that doesn't
/// exist relative to the working directory is looked up in `device_dir`.
pub fn resolve_special(special: &Path, config: &UmassConfig) -> PathBuf {
    let mut components = special.components();
    let bare = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if bare && !special.exists() {
        config.device_dir.join(special)
    } else {
        special.to_path_buf()
    }
}

/// Probe `special` and write its `label:` and `uuid:` lines, each only
/// when the volume has one.
pub fn volume_report(special: &Path, out: &mut impl Write) -> Result<(), ReportFailure> {
    let handle = probe_volume(special).map_err(ReportFailure::Probe)?;
    if !handle.is_filesystem() {
        return Err(ReportFailure::NotFilesystem);
    }

    if let Some(label) = handle.label().filter(|l| !l.is_empty()) {
        writeln!(out, "label: {}", label)?;
    }
    if let Some(uuid) = handle.uuid().filter(|u| !u.is_empty()) {
        writeln!(out, "uuid: {}", uuid)?;
    }
    Ok(())
}
