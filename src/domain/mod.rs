//! 领域模型模块
//!
//! 纯数据结构与静态表，不依赖 tokio

pub mod device;
pub mod firmware;
pub mod usb;

// Re-exports for convenience
pub use device::{DiscoveredTv, LunaCommand, TvSshConfig};
pub use firmware::{Classification, FirmwareArtifact};
pub use usb::{Filesystem, UsbDrive, FIRMWARE_DIR_NAME};
