//! TV 远程触发服务
//!
//! 通过系统 ssh 客户端向 TV 发送预定义的 luna 命令。
//! 每次调用都是独立的一次往返，不保持会话

use std::time::Duration;

use tracing::{error, info};

use crate::config::env::constants::PROBE_TIMEOUT_SECS;
use crate::domain::device::{LunaCommand, TvSshConfig};
use crate::infra::command::{CommandError, CommandRunner};
use crate::services::scan::probe_host;

/// TV 远程触发器
pub struct TvRemote {
    tv_ip: String,
    config: TvSshConfig,
}

impl TvRemote {
    pub fn new(tv_ip: String, config: TvSshConfig) -> Self {
        Self { tv_ip, config }
    }

    /// 检查 ssh / scp 是否可用
    pub fn check_prerequisites() -> Result<(), Vec<&'static str>> {
        let missing: Vec<&'static str> = ["ssh", "scp"]
            .into_iter()
            .filter(|tool| !CommandRunner::is_available(tool))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(missing)
        }
    }

    /// 测试 TV 的 SSH 端口是否可达
    pub async fn test_connection(&self) -> bool {
        let Ok(ip) = self.tv_ip.parse() else {
            error!(ip = %self.tv_ip, "Invalid IP address");
            return false;
        };

        let reachable = probe_host(
            ip,
            self.config.port,
            Duration::from_secs(PROBE_TIMEOUT_SECS),
        )
        .await;

        if reachable {
            info!(ip = %self.tv_ip, port = self.config.port, "TV is reachable");
        } else {
            error!(ip = %self.tv_ip, port = self.config.port, "Cannot connect to TV");
        }
        reachable
    }

    /// 发送打开软件更新界面的命令
    pub async fn send_software_update(&self) -> bool {
        self.execute(LunaCommand::SoftwareUpdate).await.is_some()
    }

    /// 发送打开 Expert Mode 界面的命令
    pub async fn send_expert_mode(&self) -> bool {
        self.execute(LunaCommand::ExpertMode).await.is_some()
    }

    /// 查询当前固件信息
    pub async fn get_firmware_info(&self) -> Option<String> {
        self.execute(LunaCommand::SystemInfo).await
    }

    /// 检查 TV 上是否安装了 Developer Mode
    pub async fn check_developer_mode(&self) -> bool {
        match self.execute(LunaCommand::ListApps).await {
            Some(output) => output.to_lowercase().contains("developer"),
            None => false,
        }
    }

    /// 通过外部 ssh 客户端执行一条 luna 命令
    ///
    /// 任何失败（工具缺失、超时、非零退出）都返回 `None`，不向上抛
    pub async fn execute(&self, command: LunaCommand) -> Option<String> {
        info!(action = command.description(), "Executing command via SSH");

        let args = self.ssh_args(command);
        let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
        let timeout = Duration::from_secs(self.config.command_timeout_secs);

        match CommandRunner::run_simple("ssh", &args_ref, timeout).await {
            Ok(output) if output.status.success() => {
                if command.captures_output() {
                    Some(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    Some("Command sent".to_string())
                }
            }
            Ok(output) => {
                error!(
                    status = ?output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr),
                    "SSH command failed"
                );
                None
            }
            Err(CommandError::ToolNotFound(_)) => {
                error!("SSH client not found. Please install OpenSSH.");
                None
            }
            Err(CommandError::Timeout) => {
                error!("Command timed out");
                None
            }
            Err(e) => {
                error!(error = %e, "SSH command failed");
                None
            }
        }
    }

    /// 构建 ssh 参数列表
    ///
    /// TV 每次重刷都会换 host key，因此跳过 host key 校验
    fn ssh_args(&self, command: LunaCommand) -> Vec<String> {
        vec![
            "-p".to_string(),
            self.config.port.to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.config.connect_timeout_secs),
            format!("{}@{}", self.config.username, self.tv_ip),
            command.command_line().to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssh_args_layout() {
        let remote = TvRemote::new("192.168.1.100".to_string(), TvSshConfig::default());
        let args = remote.ssh_args(LunaCommand::SoftwareUpdate);

        assert_eq!(args[0], "-p");
        assert_eq!(args[1], "9922");
        assert!(args.contains(&"StrictHostKeyChecking=no".to_string()));
        assert!(args.contains(&"prisoner@192.168.1.100".to_string()));
        assert!(args.last().unwrap().contains("softwareupdate"));
    }

    #[test]
    fn test_ssh_args_honors_config() {
        let config = TvSshConfig {
            port: 2222,
            username: "root".to_string(),
            connect_timeout_secs: 3,
            command_timeout_secs: 30,
        };
        let remote = TvRemote::new("10.0.0.5".to_string(), config);
        let args = remote.ssh_args(LunaCommand::SystemInfo);

        assert_eq!(args[1], "2222");
        assert!(args.contains(&"ConnectTimeout=3".to_string()));
        assert!(args.contains(&"root@10.0.0.5".to_string()));
    }

    #[tokio::test]
    async fn test_test_connection_invalid_ip() {
        let remote = TvRemote::new("not-an-ip".to_string(), TvSshConfig::default());
        assert!(!remote.test_connection().await);
    }
}
