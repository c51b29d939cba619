//! 环境变量配置加载

use std::env;
use std::path::PathBuf;

use crate::domain::device::TvSshConfig;

/// 环境配置
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// 固件缓存目录
    pub firmware_dir: PathBuf,
    /// TV SSH 配置
    pub ssh: TvSshConfig,
    /// 网段扫描配置
    pub scan: ScanConfig,
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        // Firmware cache dir - 默认为工作目录下的 firmware/
        let firmware_dir = env::var("LGTV_FIRMWARE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(constants::DEFAULT_FIRMWARE_DIR));

        let ssh = TvSshConfig::from_env();
        let scan = ScanConfig::from_env();

        Self {
            firmware_dir,
            ssh,
            scan,
        }
    }
}

/// 网段扫描配置
#[derive(Clone, Debug)]
pub struct ScanConfig {
    /// 单个地址的探测超时（秒）
    pub probe_timeout_secs: u64,
    /// 并发探测上限
    pub concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: constants::PROBE_TIMEOUT_SECS,
            concurrency: constants::SCAN_CONCURRENCY,
        }
    }
}

impl ScanConfig {
    pub fn from_env() -> Self {
        let probe_timeout_secs = env::var("LGTV_PROBE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(constants::PROBE_TIMEOUT_SECS);

        let concurrency = Self::parse_concurrency(env::var("LGTV_SCAN_CONCURRENCY").ok());

        Self {
            probe_timeout_secs,
            concurrency,
        }
    }

    /// 解析并发上限，0 或非法值回落到默认
    fn parse_concurrency(raw: Option<String>) -> usize {
        raw.and_then(|v| v.parse().ok())
            .filter(|&c| c > 0)
            .unwrap_or(constants::SCAN_CONCURRENCY)
    }
}

/// 常量
pub mod constants {
    /// 固件缓存目录默认值
    pub const DEFAULT_FIRMWARE_DIR: &str = "firmware";

    /// Developer Mode 的 SSH 端口
    pub const TV_SSH_PORT: u16 = 9922;

    /// Developer Mode 的 SSH 用户名
    pub const TV_SSH_USERNAME: &str = "prisoner";

    /// SSH 连接超时（秒）
    pub const SSH_CONNECT_TIMEOUT_SECS: u64 = 10;

    /// 远程命令总超时（秒）
    pub const SSH_COMMAND_TIMEOUT_SECS: u64 = 30;

    /// TCP 探测超时（秒）
    pub const PROBE_TIMEOUT_SECS: u64 = 5;

    /// 网段扫描并发上限
    pub const SCAN_CONCURRENCY: usize = 32;

    /// 固件文件最小体积（MB），低于此值视为无效
    pub const MIN_FIRMWARE_SIZE_MB: u64 = 100;

    /// 驱动器枚举命令超时（秒）
    pub const LIST_DRIVES_TIMEOUT_SECS: u64 = 10;

    /// 格式化操作超时（秒）
    pub const FORMAT_TIMEOUT_SECS: u64 = 600;

    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_config_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.probe_timeout_secs, constants::PROBE_TIMEOUT_SECS);
        assert_eq!(config.concurrency, constants::SCAN_CONCURRENCY);
    }

    #[test]
    fn test_scan_config_rejects_zero_concurrency() {
        assert_eq!(
            ScanConfig::parse_concurrency(Some("0".to_string())),
            constants::SCAN_CONCURRENCY
        );
        assert_eq!(
            ScanConfig::parse_concurrency(Some("junk".to_string())),
            constants::SCAN_CONCURRENCY
        );
        assert_eq!(ScanConfig::parse_concurrency(Some("8".to_string())), 8);
        assert_eq!(
            ScanConfig::parse_concurrency(None),
            constants::SCAN_CONCURRENCY
        );
    }
}
