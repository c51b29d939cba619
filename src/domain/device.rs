//! TV 设备端点领域模型

use std::env;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::env::constants;

/// TV SSH 连接配置
///
/// Developer Mode 在固定端口开放 SSH，用户名固定
#[derive(Clone, Debug)]
pub struct TvSshConfig {
    /// SSH 端口 (默认 9922)
    pub port: u16,
    /// 用户名 (默认 "prisoner")
    pub username: String,
    /// 连接超时秒数 (默认 10)
    pub connect_timeout_secs: u64,
    /// 远程命令总超时秒数 (默认 30)
    pub command_timeout_secs: u64,
}

impl Default for TvSshConfig {
    fn default() -> Self {
        Self {
            port: constants::TV_SSH_PORT,
            username: constants::TV_SSH_USERNAME.to_string(),
            connect_timeout_secs: constants::SSH_CONNECT_TIMEOUT_SECS,
            command_timeout_secs: constants::SSH_COMMAND_TIMEOUT_SECS,
        }
    }
}

impl TvSshConfig {
    /// 从环境变量加载 SSH 配置
    pub fn from_env() -> Self {
        let port = env::var("LGTV_SSH_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(constants::TV_SSH_PORT);

        let username =
            env::var("LGTV_SSH_USER").unwrap_or_else(|_| constants::TV_SSH_USERNAME.to_string());

        let connect_timeout_secs = env::var("LGTV_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(constants::SSH_CONNECT_TIMEOUT_SECS);

        let command_timeout_secs = env::var("LGTV_COMMAND_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(constants::SSH_COMMAND_TIMEOUT_SECS);

        Self {
            port,
            username,
            connect_timeout_secs,
            command_timeout_secs,
        }
    }
}

/// 预定义的 luna 远程命令
///
/// 只支持这几条固定命令，没有自由命令通道
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LunaCommand {
    /// 打开软件更新界面 (user 模式)
    SoftwareUpdate,
    /// 打开软件更新界面 (expert 模式)
    ExpertMode,
    /// 查询系统信息（含当前固件版本）
    SystemInfo,
    /// 列出已安装应用（用于检测 Developer Mode）
    ListApps,
}

impl LunaCommand {
    /// 在 TV 上执行的完整命令行
    pub fn command_line(&self) -> &'static str {
        match self {
            LunaCommand::SoftwareUpdate => {
                r#"luna-send-pub -d -n 1 -f "luna://com.webos.applicationManager/launch" '{"id": "com.webos.app.softwareupdate", "params": {"mode": "user", "flagUpdate": true}}'"#
            }
            LunaCommand::ExpertMode => {
                r#"luna-send-pub -d -n 1 -f "luna://com.webos.applicationManager/launch" '{"id": "com.webos.app.softwareupdate", "params": {"mode": "expert", "flagUpdate": true}}'"#
            }
            LunaCommand::SystemInfo => {
                r#"luna-send-pub -n 1 "luna://com.webos.service.tvproperty/getSystemInfo" '{}'"#
            }
            LunaCommand::ListApps => {
                r#"luna-send-pub -n 1 "luna://com.webos.applicationManager/listApps" '{}'"#
            }
        }
    }

    /// 是否需要捕获 stdout（查询类命令）
    pub fn captures_output(&self) -> bool {
        matches!(self, LunaCommand::SystemInfo | LunaCommand::ListApps)
    }

    /// 日志用的命令描述
    pub fn description(&self) -> &'static str {
        match self {
            LunaCommand::SoftwareUpdate => "open software update screen",
            LunaCommand::ExpertMode => "open expert mode screen",
            LunaCommand::SystemInfo => "query system info",
            LunaCommand::ListApps => "list installed apps",
        }
    }
}

/// 扫描发现的 TV
#[derive(Clone, Debug, Serialize)]
pub struct DiscoveredTv {
    /// IP 地址
    pub ip: IpAddr,
    /// 探测到的 SSH 端口
    pub port: u16,
    /// 连接延迟（毫秒）
    pub latency_ms: Option<f64>,
    /// 发现时间
    pub discovered_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssh_config_defaults() {
        let config = TvSshConfig::default();
        assert_eq!(config.port, 9922);
        assert_eq!(config.username, "prisoner");
    }

    #[test]
    fn test_luna_command_lines() {
        assert!(LunaCommand::SoftwareUpdate
            .command_line()
            .contains(r#""mode": "user""#));
        assert!(LunaCommand::ExpertMode
            .command_line()
            .contains(r#""mode": "expert""#));
        assert!(LunaCommand::SystemInfo.command_line().contains("getSystemInfo"));
        assert!(LunaCommand::ListApps.command_line().contains("listApps"));
    }

    #[test]
    fn test_captures_output() {
        assert!(!LunaCommand::SoftwareUpdate.captures_output());
        assert!(!LunaCommand::ExpertMode.captures_output());
        assert!(LunaCommand::SystemInfo.captures_output());
        assert!(LunaCommand::ListApps.captures_output());
    }
}
