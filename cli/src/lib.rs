//! Shared plumbing for the `umassaction` and `volumeinfo` binaries.

pub mod action;
pub mod logging;
pub mod report;

pub use action::{attach, detach, AttachFailure};
pub use logging::init_logging;
pub use report::{resolve_special, volume_report, ReportFailure};

/// Exit status for a clap parse error: help and version are not failures.
pub fn usage_exit_code(err: &clap::Error) -> i32 {
    use clap::error::ErrorKind;
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 0,
        _ => 1,
    }
}
