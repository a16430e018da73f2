// Driver/unit naming helpers shared by the tree backends and the CLI

use std::path::{Path, PathBuf};

/// Split a device instance name such as `umass-sim0` or `da12` into its
/// driver name and unit number.
pub fn split_unit(name: &str) -> Option<(&str, u32)> {
    let digits_at = name
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    if digits_at == 0 {
        return None;
    }
    let unit = name[digits_at..].parse().ok()?;
    Some((&name[..digits_at], unit))
}

/// Parse the unit number out of a device name reported by the OS event
/// system (`umass3`), or out of a bare number (`3`).
pub fn parse_unit_name(name: &str, driver: &str) -> Option<u32> {
    let name = name.trim();
    if let Ok(unit) = name.parse() {
        return Some(unit);
    }
    match split_unit(name) {
        Some((prefix, unit)) if prefix == driver => Some(unit),
        _ => None,
    }
}

/// Conventional node path for a peripheral instance, e.g. `/dev/da2`.
pub fn peripheral_node_path(dir: &Path, driver: &str, unit: u32) -> PathBuf {
    dir.join(format!("{}{}", driver, unit))
}
