pub mod cam;
pub mod matcher;
pub mod naming;
pub mod tree;

pub use cam::CamDeviceTree;
pub use matcher::{resolve_peripheral, DeviceTreeMatcher, PageStream};
pub use naming::{parse_unit_name, peripheral_node_path, split_unit};
pub use tree::{DeviceTree, RecordSession, StaticDeviceTree, TreeSession};

/// Device-tree backend used by the command-line tools.
pub type PlatformDeviceTree = CamDeviceTree;
