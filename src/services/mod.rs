//! 服务层模块
//!
//! 包含核心业务逻辑

pub mod locator;
pub mod remote;
pub mod scan;
pub mod stager;
pub mod wizard;
