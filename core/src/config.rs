use crate::{UmassError, DEFAULT_PAGE_CAPACITY};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming a config file to load.
pub const CONFIG_ENV: &str = "UMASS_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UmassConfig {
    /// Driver name of the mass-storage bus, as the device tree reports it.
    pub bus_driver: String,
    /// Peripheral driver whose instances carry the disk nodes.
    pub peripheral_driver: String,
    /// Directory holding the device nodes.
    pub device_dir: PathBuf,
    /// Records fetched per device-tree round-trip.
    pub page_capacity: usize,
    /// CAM control tool used to list the device tree.
    pub camcontrol: PathBuf,
}

impl Default for UmassConfig {
    fn default() -> Self {
        Self {
            bus_driver: "umass-sim".to_string(),
            peripheral_driver: "da".to_string(),
            device_dir: PathBuf::from("/dev"),
            page_capacity: DEFAULT_PAGE_CAPACITY,
            camcontrol: PathBuf::from("camcontrol"),
        }
    }
}

impl UmassConfig {
    pub fn from_file(path: &Path) -> Result<Self, UmassError> {
        let text = fs::read_to_string(path).map_err(|e| {
            UmassError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        tracing::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve the configuration for a run.
    ///
    /// An explicit path must exist. Otherwise `$UMASS_CONFIG` is tried, then
    /// `<config dir>/umass/config.json`, falling back to the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, UmassError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }

        if let Some(path) = Self::default_path() {
            if path.is_file() {
                return Self::from_file(&path);
            }
        }

        tracing::trace!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("umass").join("config.json"))
    }

    pub fn validate(&self) -> Result<(), UmassError> {
        if self.page_capacity == 0 {
            return Err(UmassError::Configuration(
                "page_capacity must be at least 1".to_string(),
            ));
        }
        if self.bus_driver.is_empty() || self.peripheral_driver.is_empty() {
            return Err(UmassError::Configuration(
                "driver names must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
