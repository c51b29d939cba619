//! 命令执行器
//!
//! 提供统一的外部命令执行接口，支持：
//! - 超时控制
//! - stdout/stderr 捕获
//! - 工具缺失检测（ssh 等外部工具可能未安装）

use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

/// 命令执行器
pub struct CommandRunner;

/// 命令执行错误
#[derive(Debug)]
pub enum CommandError {
    /// 外部工具不存在
    ToolNotFound(String),
    /// 命令启动失败
    SpawnFailed(std::io::Error),
    /// 命令超时
    Timeout,
    /// 等待命令完成失败
    WaitFailed(std::io::Error),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::ToolNotFound(tool) => write!(f, "Required tool not found: {}", tool),
            CommandError::SpawnFailed(e) => write!(f, "Failed to spawn command: {}", e),
            CommandError::Timeout => write!(f, "Command timed out"),
            CommandError::WaitFailed(e) => write!(f, "Failed to wait for command: {}", e),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::SpawnFailed(e) | CommandError::WaitFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl CommandRunner {
    /// 执行命令并捕获输出
    ///
    /// 超时后放弃等待并返回 `Timeout`；工具不存在返回 `ToolNotFound`
    pub async fn run_simple(
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<std::process::Output, CommandError> {
        debug!(program, ?args, "Running external command");

        let child = Command::new(program).args(args).kill_on_drop(true).output();

        tokio::select! {
            result = child => {
                result.map_err(|e| Self::classify_spawn_error(program, e))
            }
            _ = tokio::time::sleep(timeout) => {
                Err(CommandError::Timeout)
            }
        }
    }

    /// 执行命令，stdio 继承自当前进程（用于需要终端交互的工具）
    pub async fn run_interactive(
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<std::process::ExitStatus, CommandError> {
        debug!(program, ?args, "Running interactive command");

        let mut child = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Self::classify_spawn_error(program, e))?;

        tokio::select! {
            status = child.wait() => {
                status.map_err(CommandError::WaitFailed)
            }
            _ = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                Err(CommandError::Timeout)
            }
        }
    }

    /// 检查外部工具是否在 PATH 中
    pub fn is_available(program: &str) -> bool {
        let Some(paths) = std::env::var_os("PATH") else {
            return false;
        };

        std::env::split_paths(&paths).any(|dir| {
            if dir.join(program).is_file() {
                return true;
            }
            if cfg!(windows) {
                dir.join(format!("{}.exe", program)).is_file()
            } else {
                false
            }
        })
    }

    fn classify_spawn_error(program: &str, e: std::io::Error) -> CommandError {
        if e.kind() == std::io::ErrorKind::NotFound {
            CommandError::ToolNotFound(program.to_string())
        } else {
            CommandError::SpawnFailed(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_simple_success() {
        let result = CommandRunner::run_simple("echo", &["hello"], Duration::from_secs(5)).await;

        assert!(result.is_ok());
        let output = result.unwrap();
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("hello"));
    }

    #[tokio::test]
    async fn test_run_simple_not_found() {
        let result =
            CommandRunner::run_simple("nonexistent_command_12345", &[], Duration::from_secs(5))
                .await;

        assert!(matches!(result, Err(CommandError::ToolNotFound(_))));
    }

    #[tokio::test]
    async fn test_run_simple_timeout() {
        let result = CommandRunner::run_simple("sleep", &["5"], Duration::from_millis(100)).await;

        assert!(matches!(result, Err(CommandError::Timeout)));
    }

    #[test]
    fn test_is_available() {
        assert!(CommandRunner::is_available("ls") || CommandRunner::is_available("cmd"));
        assert!(!CommandRunner::is_available("nonexistent_command_12345"));
    }
}
