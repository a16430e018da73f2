use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UmassError {
    #[error("Device tree unavailable: {0}")]
    TreeUnavailable(String),

    #[error("Device tree enumeration failed (status {status:#x})")]
    EnumerationFailed { status: u32 },

    #[error("Could not open {}: {source}", path.display())]
    NodeOpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No recognised signature on {}", .0.display())]
    Unrecognized(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by the volume prober. Only `NodeOpenFailed`,
/// `Unrecognized` and `Io` are produced there.
pub type ProbeError = UmassError;

