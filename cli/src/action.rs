// attach/detach handling for umassaction

use log::{debug, info};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use umass_core::{UmassConfig, UmassError};
use umass_filesystems::probe_volume;
use umass_platform::{parse_unit_name, peripheral_node_path, DeviceTree, DeviceTreeMatcher};

/// Device-name prefix the OS event system uses for mass-storage controllers.
const EVENT_DRIVER: &str = "umass";

#[derive(Debug, Error)]
pub enum AttachFailure {
    #[error("cannot parse a unit number from '{0}'")]
    BadDevice(String),

    #[error("device tree query failed: {0}")]
    Tree(#[source] UmassError),

    #[error("no {driver} peripheral under {bus}")]
    NoPeripheral { bus: String, driver: String },

    #[error("cannot probe {path}: {source}")]
    Probe {
        path: PathBuf,
        #[source]
        source: UmassError,
    },

    #[error("cannot write output: {0}")]
    Output(#[from] std::io::Error),
}

impl AttachFailure {
    pub fn exit_code(&self) -> i32 {
        match self {
            AttachFailure::BadDevice(_) => 1,
            AttachFailure::Tree(_) | AttachFailure::Output(_) => 2,
            AttachFailure::NoPeripheral { .. } => 3,
            AttachFailure::Probe { .. } => 4,
        }
    }
}

fn bus_unit(device: &str, config: &UmassConfig) -> Option<u32> {
    parse_unit_name(device, &config.bus_driver).or_else(|| parse_unit_name(device, EVENT_DRIVER))
}

/// Resolve the peripheral created under `device`, probe its node and write
/// `node: <path>` followed by the volume properties to `out`.
pub fn attach<T: DeviceTree>(
    tree: T,
    config: &UmassConfig,
    device: &str,
    out: &mut impl Write,
) -> Result<PathBuf, AttachFailure> {
    let unit = bus_unit(device, config).ok_or_else(|| AttachFailure::BadDevice(device.into()))?;
    debug!("{} is {}{}", device, config.bus_driver, unit);

    let peripheral = DeviceTreeMatcher::new(tree)
        .with_page_capacity(config.page_capacity)
        .resolve_peripheral(&config.bus_driver, unit, &config.peripheral_driver)
        .map_err(AttachFailure::Tree)?
        .ok_or_else(|| AttachFailure::NoPeripheral {
            bus: format!("{}{}", config.bus_driver, unit),
            driver: config.peripheral_driver.clone(),
        })?;

    let node = peripheral_node_path(&config.device_dir, &config.peripheral_driver, peripheral);
    info!("{} attached as {}", device, node.display());

    let handle = probe_volume(&node).map_err(|source| AttachFailure::Probe {
        path: node.clone(),
        source,
    })?;

    writeln!(out, "node: {}", node.display())?;
    for (key, value) in handle.pairs() {
        writeln!(out, "{}: {}", key, value)?;
    }
    Ok(node)
}

/// Nothing is tracked between events, so detach only acknowledges.
pub fn detach(device: &str, out: &mut impl Write) -> std::io::Result<()> {
    info!("{} detached", device);
    writeln!(out, "detach: {}", device)
}
