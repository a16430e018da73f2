pub mod config;
pub mod device;
pub mod error;
pub mod volume;

pub use config::UmassConfig;
pub use device::{
    BusMatch, Continuation, DeviceTreeQuery, EnumerationPage, MatchKinds, MatchResult, PageStatus,
    PeripheralMatch, Selector, DEFAULT_PAGE_CAPACITY,
};
pub use error::{ProbeError, UmassError};
pub use volume::{Usage, VolumeField, VolumeInfo};
