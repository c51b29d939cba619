//! 交互式向导
//!
//! 一步一步引导用户完成降级流程，默认入口

use std::io::Write as _;

use tracing::error;

use crate::config::EnvConfig;
use crate::domain::firmware::{self, Classification};
use crate::domain::usb::Filesystem;
use crate::services::locator::FirmwareLocator;
use crate::services::remote::TvRemote;
use crate::services::scan::{detect_local_ip, NetworkScanner};
use crate::services::stager::UsbStager;

const DEFAULT_MODEL: &str = "LG-43UP75006LF";
const DEFAULT_FIRMWARE: &str = "03.21.30";

/// 交互式向导
pub struct Wizard {
    env: EnvConfig,
    tv_model: String,
    target_firmware: String,
}

impl Wizard {
    pub fn new(env: EnvConfig, model: Option<String>, firmware: Option<String>) -> Self {
        Self {
            env,
            tv_model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            target_firmware: firmware.unwrap_or_else(|| DEFAULT_FIRMWARE.to_string()),
        }
    }

    /// 运行向导
    pub async fn run(&mut self) -> anyhow::Result<()> {
        println!(
            r#"
╔═══════════════════════════════════════════════════════════════╗
║     LG TV Firmware Downgrade Utility - Interactive Wizard     ║
╚═══════════════════════════════════════════════════════════════╝

WARNING: This process carries risks. Please read the documentation
before proceeding. You could brick your TV or void your warranty.
"#
        );

        // Step 1: TV 型号
        println!("\nStep 1: Enter your TV model");
        println!("   Example: LG-43UP75006LF, 43NANO75KPA, OLED65CX6LA");
        let model = prompt("\n   TV Model: ");
        if !model.is_empty() {
            self.tv_model = model;
        }

        // Step 2: 目标固件版本
        println!("\nStep 2: Enter target firmware version");
        println!("   Example: 03.21.30, 03.20.14");
        let version = prompt("\n   Target Firmware: ");
        if !version.is_empty() {
            self.target_firmware = version;
        }
        self.print_classification();

        // Step 3: 降级方式
        println!("\nStep 3: Choose downgrade method");
        println!("   1. Web Browser Method (Easiest - No Dev Mode)");
        println!("   2. IPK File Method (Requires Developer Mode)");
        println!("   3. SSH Command Method (Advanced)");
        println!("   4. Prepare USB only");

        match prompt("\n   Choice (1-4): ").as_str() {
            "1" => self.method_web_browser().await,
            "2" => self.method_ipk().await,
            "3" => self.method_ssh().await,
            "4" => self.method_usb_only().await,
            other => {
                error!(choice = other, "Invalid choice");
                Ok(())
            }
        }
    }

    /// 目标版本的分类提示
    fn print_classification(&self) {
        match firmware::classify(&self.target_firmware) {
            Classification::Rootable => {
                let family =
                    firmware::webos_family(&self.target_firmware).unwrap_or("webOS");
                println!(
                    "   -> {} is a known rootable version ({})",
                    self.target_firmware, family
                );
            }
            Classification::Patched { recommended } => {
                println!(
                    "   -> {} is patched; consider downgrading to {}",
                    self.target_firmware, recommended
                );
            }
            Classification::Unknown => {
                println!(
                    "   -> {} is not in the known-version tables",
                    self.target_firmware
                );
            }
        }
    }

    /// 方式 1: 浏览器降级
    async fn method_web_browser(&self) -> anyhow::Result<()> {
        print_header("METHOD 1: WebOS App Club Online Downgrade");

        let Some(firmware_path) = self.find_firmware()? else {
            return Ok(());
        };

        println!("\nInstructions:");
        println!("1. Prepare your USB drive with the firmware");
        if self.prompt_and_prepare_usb(&firmware_path).await {
            println!("\n2. On your TV:");
            println!("   - Open the Web Browser");
            println!("   - Go to: https://webosapp.club/downgrade/");
            println!("   - Click Yes/OK when prompted");
            println!("   - Select firmware from USB drive");
        }
        Ok(())
    }

    /// 方式 2: IPK 文件降级
    async fn method_ipk(&self) -> anyhow::Result<()> {
        print_header("METHOD 2: IPK File Downgrade");

        println!("\nPrerequisites:");
        println!("- Developer Mode must be installed on your TV");
        println!("- LG Developer Manager Desktop App must be installed");

        let Some(firmware_path) = self.find_firmware()? else {
            return Ok(());
        };

        self.prompt_and_prepare_usb(&firmware_path).await;

        println!("\nNext Steps:");
        println!("1. Download: webos4x-6x.expertmode.downgrade_1.0.0_all.ipk");
        println!("2. Install via LG Developer Manager");
        println!("3. Open the app and select firmware from USB");
        Ok(())
    }

    /// 方式 3: SSH 命令降级
    async fn method_ssh(&self) -> anyhow::Result<()> {
        print_header("METHOD 3: SSH Command Downgrade");

        if let Err(missing) = TvRemote::check_prerequisites() {
            error!(missing = ?missing, "Missing required commands");
            println!("Please install OpenSSH client");
            return Ok(());
        }

        let tv_ip = match prompt("\n   Enter your TV IP address (empty to scan): ").as_str() {
            "" => match self.scan_for_tv().await {
                Some(ip) => ip,
                None => return Ok(()),
            },
            entered => entered.to_string(),
        };

        let remote = TvRemote::new(tv_ip.clone(), self.env.ssh.clone());
        if !remote.test_connection().await {
            println!("\nCannot connect to TV");
            println!("   Troubleshooting:");
            println!("   - Verify TV is on");
            println!("   - Check TV and PC are on same network");
            println!("   - Make sure Developer Mode is enabled");
            return Ok(());
        }

        if let Some(info) = remote.get_firmware_info().await {
            println!("\nCurrent system info:\n{}", info.trim());
        }
        if !remote.check_developer_mode().await {
            println!("\n   Note: Developer Mode app not detected on this TV");
        }

        let Some(firmware_path) = self.find_firmware()? else {
            return Ok(());
        };

        self.prompt_and_prepare_usb(&firmware_path).await;

        match prompt("\n   Send downgrade command now? (y = yes / e = expert mode / n = no): ")
            .to_lowercase()
            .as_str()
        {
            "y" => {
                if remote.send_software_update().await {
                    println!("\nCommand sent successfully");
                    println!("Please check your TV screen for the software update menu");
                }
            }
            "e" => {
                if remote.send_expert_mode().await {
                    println!("\nExpert Mode command sent");
                    println!("Please check your TV screen for the software update menu");
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// 方式 4: 仅准备 USB
    async fn method_usb_only(&self) -> anyhow::Result<()> {
        print_header("USB PREPARATION ONLY");

        let Some(firmware_path) = self.find_firmware()? else {
            return Ok(());
        };

        self.prompt_and_prepare_usb(&firmware_path).await;
        Ok(())
    }

    /// 扫描网段并让用户选择一台 TV
    async fn scan_for_tv(&self) -> Option<String> {
        let Some(local_ip) = detect_local_ip() else {
            error!("Could not determine local IP address");
            return None;
        };

        println!("\n   Scanning local network for LG TVs...");
        let scanner = NetworkScanner::new(self.env.scan.clone(), self.env.ssh.port);
        let found = scanner.find_first(local_ip).await;

        match found {
            Some(tv) => {
                println!("   Found TV at {}", tv.ip);
                Some(tv.ip.to_string())
            }
            None => {
                println!("   No LG TVs found on local network");
                None
            }
        }
    }

    fn find_firmware(&self) -> anyhow::Result<Option<std::path::PathBuf>> {
        let locator = FirmwareLocator::new(
            self.env.firmware_dir.clone(),
            &self.tv_model,
            &self.target_firmware,
        );
        locator.find()
    }

    /// 询问 USB 路径并复制固件；返回是否成功
    async fn prompt_and_prepare_usb(&self, firmware_path: &std::path::Path) -> bool {
        // 先列出检测到的驱动器作为参考
        let drives = UsbStager::list_usb_drives().await;
        if !drives.is_empty() {
            println!("\nDetected USB drives:");
            for drive in &drives {
                match (&drive.name, &drive.size) {
                    (Some(name), Some(size)) => {
                        println!("   - {} ({}, {})", drive.path.display(), name, size);
                    }
                    (Some(name), None) => println!("   - {} ({})", drive.path.display(), name),
                    _ => println!("   - {}", drive.path.display()),
                }
            }
        }

        let usb_path = prompt("\n   Enter USB drive path (e.g. /media/usb or E:): ");
        if usb_path.is_empty() {
            return false;
        }

        let stager = UsbStager::new(&usb_path);

        if prompt("\n   Format the drive first? This ERASES ALL DATA (y/N): ").to_lowercase() == "y"
        {
            let fs_type = Filesystem::from_str(&prompt("   Filesystem (FAT32/NTFS) [FAT32]: "));
            match stager.format_drive(fs_type).await {
                Ok(true) => println!("   Drive formatted as {}", fs_type.label()),
                Ok(false) => println!("   Format skipped"),
                Err(e) => {
                    error!(error = %e, "Format failed");
                    return false;
                }
            }
        }

        match stager.prepare_firmware(firmware_path).await {
            Ok(dest) => {
                stager.print_summary(&dest).await;
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to prepare USB drive");
                false
            }
        }
    }
}

fn print_header(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{}", title);
    println!("{}", "=".repeat(60));
}

/// 读取一行输入并去掉首尾空白
fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = std::io::stdout().flush();

    let mut input = String::new();
    if std::io::stdin().read_line(&mut input).is_err() {
        return String::new();
    }
    input.trim().to_string()
}
