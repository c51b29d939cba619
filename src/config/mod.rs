//! 配置模块

pub mod env;

pub use env::{EnvConfig, ScanConfig};
