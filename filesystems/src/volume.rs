// Open-and-probe lifecycle for a single device node

use crate::detection::detect_volume;
use crate::device_reader::ProbeReader;
use crate::utils::{media_size, open_node_read};
use log::{debug, info};
use std::fs::File;
use std::path::{Path, PathBuf};
use umass_core::{UmassError, Usage, VolumeField, VolumeInfo};

/// An open device node together with what probing found on it.
///
/// The node stays open for as long as the handle lives; dropping the
/// handle (or calling [`VolumeHandle::close`]) releases it.
#[derive(Debug)]
pub struct VolumeHandle {
    path: PathBuf,
    file: File,
    media_size: u64,
    info: Option<VolumeInfo>,
}

impl VolumeHandle {
    /// Open `path` read-only without probing it yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, UmassError> {
        let path = path.as_ref().to_path_buf();
        let file = open_node_read(&path)?;
        let media_size = media_size(&file);
        debug!("opened {} ({} bytes)", path.display(), media_size);
        Ok(Self {
            path,
            file,
            media_size,
            info: None,
        })
    }

    /// Run the detectors over the node. Returns whether anything matched.
    pub fn probe(&mut self) -> Result<bool, UmassError> {
        let mut reader = ProbeReader::new(&mut self.file, self.media_size);
        self.info = detect_volume(&mut reader)?;
        Ok(self.info.is_some())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size reported by the device, 0 when unknown.
    pub fn media_size(&self) -> u64 {
        self.media_size
    }

    pub fn info(&self) -> Option<&VolumeInfo> {
        self.info.as_ref()
    }

    pub fn usage(&self) -> Usage {
        self.info.as_ref().map(|i| i.usage).unwrap_or_default()
    }

    pub fn is_filesystem(&self) -> bool {
        self.usage() == Usage::Filesystem
    }

    pub fn label(&self) -> Option<&VolumeField> {
        self.info.as_ref().map(|i| &i.label)
    }

    pub fn uuid(&self) -> Option<&VolumeField> {
        self.info.as_ref().map(|i| &i.uuid)
    }

    pub fn filesystem_type(&self) -> Option<&VolumeField> {
        self.info.as_ref().map(|i| &i.filesystem_type)
    }

    pub fn type_version(&self) -> Option<&VolumeField> {
        self.info.as_ref().map(|i| &i.type_version)
    }

    /// Every non-empty property as `(key, value)`.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        self.info.as_ref().map(VolumeInfo::pairs).unwrap_or_default()
    }

    /// Release the node and keep only the probe result.
    pub fn close(self) -> Option<VolumeInfo> {
        debug!("closing {}", self.path.display());
        self.info
    }
}

/// Open `path` and identify the volume on it.
///
/// Fails with [`UmassError::NodeOpenFailed`] if the node can't be opened and
/// [`UmassError::Unrecognized`] if no signature matched. In both cases the
/// node is closed before returning.
pub fn probe_volume(path: impl AsRef<Path>) -> Result<VolumeHandle, UmassError> {
    let mut handle = VolumeHandle::open(path)?;
    if handle.probe()? {
        if let Some(found) = handle.info() {
            info!(
                "{}: {} label={:?} uuid={:?}",
                handle.path.display(),
                found.filesystem_type,
                found.label,
                found.uuid
            );
        }
        Ok(handle)
    } else {
        let path = handle.path.clone();
        handle.close();
        Err(UmassError::Unrecognized(path))
    }
}
