// Non-filesystem containers: encrypted volumes and swap areas

mod luks;
mod swap;

pub use luks::LuksDetector;
pub use swap::SwapDetector;
