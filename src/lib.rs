//! LG TV Firmware Downgrader - webOS 固件降级工具
//!
//! 模块化的库入口

pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::config::EnvConfig;
use crate::domain::firmware;
use crate::services::locator::FirmwareLocator;
use crate::services::remote::TvRemote;
use crate::services::scan::{self, NetworkScanner};
use crate::services::stager::UsbStager;
use crate::services::wizard::Wizard;

/// 命令行动作
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Action {
    /// 交互式向导（默认）
    #[default]
    Wizard,
    /// 仅查找固件
    FindFirmware,
    /// 准备 USB 驱动器
    PrepareUsb,
    /// 通过 SSH 发送降级命令
    SendCommand,
    /// 扫描局域网内的 TV
    Scan,
}

/// 运行时配置（来自命令行参数）
#[derive(Clone, Debug, Default)]
pub struct RuntimeConfig {
    /// TV 型号 (如 LG-43UP75006LF)
    pub model: Option<String>,
    /// 目标固件版本 (如 03.21.30)
    pub firmware: Option<String>,
    /// USB 驱动器路径
    pub usb_path: Option<String>,
    /// TV 的 IP 地址
    pub tv_ip: Option<String>,
    /// 要执行的动作
    pub action: Action,
}

/// 初始化日志并根据配置执行动作
pub async fn init_and_run(config: RuntimeConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let env = EnvConfig::from_env();

    match config.action {
        Action::Wizard => {
            let mut wizard = Wizard::new(env, config.model, config.firmware);
            wizard.run().await
        }
        Action::FindFirmware => run_find_firmware(&env, &config).await,
        Action::PrepareUsb => run_prepare_usb(&env, &config).await,
        Action::SendCommand => run_send_command(&env, &config).await,
        Action::Scan => run_scan(&env).await,
    }
}

/// 查找固件并打印分类结果
async fn run_find_firmware(env: &EnvConfig, config: &RuntimeConfig) -> anyhow::Result<()> {
    let (model, version) = require_model_and_firmware(config)?;

    match firmware::classify(&version) {
        firmware::Classification::Rootable => {
            println!("Version {} is rootable - no downgrade needed", version);
        }
        firmware::Classification::Patched { recommended } => {
            println!(
                "Version {} is patched - recommended downgrade target: {}",
                version, recommended
            );
        }
        firmware::Classification::Unknown => {
            println!("Version {} is not in the known-version tables", version);
        }
    }

    let locator = FirmwareLocator::new(env.firmware_dir.clone(), &model, &version);
    match locator.find()? {
        Some(path) => {
            println!("Firmware: {}", path.display());
            Ok(())
        }
        None => anyhow::bail!("firmware for version {} not found in cache", version),
    }
}

/// 查找固件并复制到 USB
async fn run_prepare_usb(env: &EnvConfig, config: &RuntimeConfig) -> anyhow::Result<()> {
    let (model, version) = require_model_and_firmware(config)?;
    let usb_path = config
        .usb_path
        .clone()
        .ok_or_else(|| anyhow::anyhow!("--usb is required"))?;

    let locator = FirmwareLocator::new(env.firmware_dir.clone(), &model, &version);
    let Some(firmware_path) = locator.find()? else {
        anyhow::bail!("firmware for version {} not found in cache", version);
    };

    let stager = UsbStager::new(usb_path);
    let dest = stager.prepare_firmware(&firmware_path).await?;
    stager.print_summary(&dest).await;
    Ok(())
}

/// 探测 TV 并发送软件更新命令
async fn run_send_command(env: &EnvConfig, config: &RuntimeConfig) -> anyhow::Result<()> {
    let tv_ip = config
        .tv_ip
        .clone()
        .ok_or_else(|| anyhow::anyhow!("--ip is required for --send-command"))?;

    let remote = TvRemote::new(tv_ip.clone(), env.ssh.clone());
    if !remote.test_connection().await {
        anyhow::bail!("cannot connect to TV at {}", tv_ip);
    }

    if remote.send_software_update().await {
        println!("Command sent - check your TV screen for the software update menu");
        Ok(())
    } else {
        anyhow::bail!("failed to send downgrade command")
    }
}

/// 扫描本地 /24 网段
async fn run_scan(env: &EnvConfig) -> anyhow::Result<()> {
    let Some(local_ip) = scan::detect_local_ip() else {
        anyhow::bail!("could not determine local IP address");
    };

    let o = local_ip.octets();
    println!("Scanning {}.{}.{}.0/24 for LG TVs...", o[0], o[1], o[2]);

    let scanner = NetworkScanner::new(env.scan.clone(), env.ssh.port);
    let cancel = tokio_util::sync::CancellationToken::new();
    let found = scanner.sweep(local_ip, cancel).await;

    if found.is_empty() {
        println!("No LG TVs found");
    } else {
        println!("Found {} device(s):", found.len());
        for tv in &found {
            match tv.latency_ms {
                Some(ms) => println!("  - {} ({:.0} ms)", tv.ip, ms),
                None => println!("  - {}", tv.ip),
            }
        }
    }
    Ok(())
}

fn require_model_and_firmware(config: &RuntimeConfig) -> anyhow::Result<(String, String)> {
    match (&config.model, &config.firmware) {
        (Some(m), Some(f)) => Ok((m.clone(), f.clone())),
        _ => {
            error!("--model and --firmware are required");
            anyhow::bail!("--model and --firmware are required")
        }
    }
}
