//! USB 准备服务
//!
//! 把固件文件复制到 `<volume>/LG_DTV/`，并提供驱动器枚举和
//! 破坏性的格式化操作（需要显式输入 YES 确认）

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::fs;
use tracing::{error, info, warn};

use crate::config::env::constants::{FORMAT_TIMEOUT_SECS, LIST_DRIVES_TIMEOUT_SECS};
use crate::domain::usb::{staged_path, Filesystem, UsbDrive, FIRMWARE_DIR_NAME};
use crate::infra::command::CommandRunner;

/// USB 准备错误
#[derive(Debug, Error)]
pub enum StageError {
    #[error("firmware not found: {0}")]
    SourceMissing(PathBuf),

    #[error("USB path not found: {0}")]
    VolumeMissing(PathBuf),

    #[error("failed to create {dir}: {source}")]
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to copy firmware: {0}")]
    Copy(std::io::Error),

    #[error("verification failed - file not copied: {0}")]
    VerifyFailed(PathBuf),

    #[error("format failed: {0}")]
    FormatFailed(String),

    #[error("unsupported platform")]
    UnsupportedPlatform,
}

/// USB 准备器
pub struct UsbStager {
    usb_path: PathBuf,
}

impl UsbStager {
    pub fn new(usb_path: impl Into<PathBuf>) -> Self {
        Self {
            usb_path: usb_path.into(),
        }
    }

    /// 把固件复制到 `<volume>/LG_DTV/` 并验证
    ///
    /// 重复调用是幂等的，目标文件会被覆盖
    pub async fn prepare_firmware(&self, firmware_path: &Path) -> Result<PathBuf, StageError> {
        if !firmware_path.exists() {
            error!(path = %firmware_path.display(), "Firmware not found");
            return Err(StageError::SourceMissing(firmware_path.to_path_buf()));
        }

        if !self.usb_path.exists() {
            error!(path = %self.usb_path.display(), "USB path not found");
            return Err(StageError::VolumeMissing(self.usb_path.clone()));
        }

        let lg_dtv_dir = self.usb_path.join(FIRMWARE_DIR_NAME);
        fs::create_dir_all(&lg_dtv_dir)
            .await
            .map_err(|source| StageError::CreateDir {
                dir: lg_dtv_dir.clone(),
                source,
            })?;
        info!(dir = %lg_dtv_dir.display(), "Created LG_DTV folder");

        let firmware_name = firmware_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| StageError::SourceMissing(firmware_path.to_path_buf()))?;
        let dest_path = staged_path(&self.usb_path, &firmware_name);

        let copied = fs::copy(firmware_path, &dest_path)
            .await
            .map_err(StageError::Copy)?;
        info!(
            dest = %dest_path.display(),
            size_mb = %format!("{:.1}", copied as f64 / (1024.0 * 1024.0)),
            "Copied firmware"
        );

        if !dest_path.exists() {
            return Err(StageError::VerifyFailed(dest_path));
        }

        info!("USB drive prepared successfully");
        Ok(dest_path)
    }

    /// 打印准备完成摘要
    pub async fn print_summary(&self, dest_path: &Path) {
        let size_mb = fs::metadata(dest_path)
            .await
            .map(|m| m.len() as f64 / (1024.0 * 1024.0))
            .unwrap_or(0.0);
        let name = dest_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        println!(
            r#"
═══════════════════════════════════════════════════════════════
                    USB PREPARATION COMPLETE
═══════════════════════════════════════════════════════════════

USB Path:     {}
Firmware:     {}
Size:         {:.1} MB
Location:     {}/{}

Your USB drive is ready!

Next steps:
1. Safely eject the USB drive
2. Plug it into your LG TV
3. Follow your chosen downgrade method
═══════════════════════════════════════════════════════════════
"#,
            self.usb_path.display(),
            name,
            size_mb,
            FIRMWARE_DIR_NAME,
            name,
        );
    }

    /// 枚举系统中的可移动驱动器
    pub async fn list_usb_drives() -> Vec<UsbDrive> {
        #[cfg(target_os = "linux")]
        {
            Self::list_linux_drives().await
        }

        #[cfg(target_os = "macos")]
        {
            Self::list_macos_drives().await
        }

        #[cfg(target_os = "windows")]
        {
            Self::list_windows_drives().await
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            Vec::new()
        }
    }

    /// Linux: lsblk JSON 输出 + 常见挂载点兜底
    #[cfg(target_os = "linux")]
    async fn list_linux_drives() -> Vec<UsbDrive> {
        use serde::Deserialize;

        #[derive(Debug, Deserialize)]
        struct LsblkOutput {
            #[serde(default)]
            blockdevices: Vec<LsblkDevice>,
        }

        #[derive(Debug, Deserialize)]
        struct LsblkDevice {
            name: String,
            size: Option<String>,
            #[serde(rename = "type")]
            devtype: Option<String>,
            mountpoint: Option<String>,
            #[serde(default)]
            children: Vec<LsblkDevice>,
        }

        fn collect(device: &LsblkDevice, drives: &mut Vec<UsbDrive>) {
            let is_storage = matches!(device.devtype.as_deref(), Some("disk") | Some("part"));
            if let (true, Some(mountpoint)) = (is_storage, device.mountpoint.as_deref()) {
                // 跳过系统挂载点
                if mountpoint != "/" && !mountpoint.starts_with("/boot") {
                    drives.push(UsbDrive {
                        path: PathBuf::from(mountpoint),
                        name: Some(device.name.clone()),
                        size: device.size.clone(),
                    });
                }
            }
            for child in &device.children {
                collect(child, drives);
            }
        }

        let mut drives = Vec::new();

        let result = CommandRunner::run_simple(
            "lsblk",
            &["-o", "NAME,SIZE,TYPE,MOUNTPOINT", "-J"],
            Duration::from_secs(LIST_DRIVES_TIMEOUT_SECS),
        )
        .await;

        match result {
            Ok(output) if output.status.success() => {
                match serde_json::from_slice::<LsblkOutput>(&output.stdout) {
                    Ok(parsed) => {
                        for device in &parsed.blockdevices {
                            collect(device, &mut drives);
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to parse lsblk output"),
                }
            }
            Ok(output) => warn!(status = ?output.status, "lsblk returned non-zero"),
            Err(e) => warn!(error = %e, "Could not list drives via lsblk"),
        }

        // Fallback: 扫描常见挂载目录的一级子目录
        for mount_root in ["/media", "/mnt", "/run/media"] {
            let Ok(mut entries) = fs::read_dir(mount_root).await else {
                continue;
            };
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                if path.is_dir() && !drives.iter().any(|d| d.path == path) {
                    drives.push(UsbDrive {
                        path,
                        name: entry.file_name().into_string().ok(),
                        size: None,
                    });
                }
            }
        }

        drives
    }

    /// macOS: /Volumes 下的目录
    #[cfg(target_os = "macos")]
    async fn list_macos_drives() -> Vec<UsbDrive> {
        let mut drives = Vec::new();

        let Ok(mut entries) = fs::read_dir("/Volumes").await else {
            return drives;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.path().is_dir() && !name.starts_with('.') {
                drives.push(UsbDrive {
                    path: entry.path(),
                    name: Some(name),
                    size: None,
                });
            }
        }

        drives
    }

    /// Windows: wmic 枚举可移动盘 (drivetype=2)
    #[cfg(target_os = "windows")]
    async fn list_windows_drives() -> Vec<UsbDrive> {
        let mut drives = Vec::new();

        let result = CommandRunner::run_simple(
            "wmic",
            &[
                "logicaldisk",
                "where",
                "drivetype=2",
                "get",
                "DeviceID,Size,VolumeName",
                "/format:csv",
            ],
            Duration::from_secs(LIST_DRIVES_TIMEOUT_SECS),
        )
        .await;

        let Ok(output) = result else {
            return drives;
        };

        // CSV 格式: Node,DeviceID,Size,VolumeName
        for line in String::from_utf8_lossy(&output.stdout).lines().skip(1) {
            let fields: Vec<&str> = line.trim().split(',').collect();
            if fields.len() >= 2 && !fields[1].is_empty() {
                drives.push(UsbDrive {
                    path: PathBuf::from(format!("{}\\", fields[1])),
                    name: fields.get(3).map(|s| s.to_string()).filter(|s| !s.is_empty()),
                    size: fields.get(2).map(|s| s.to_string()).filter(|s| !s.is_empty()),
                });
            }
        }

        drives
    }

    /// 格式化驱动器 - 会清空全部数据，不可回滚
    ///
    /// 需要用户输入 `YES` 确认；其他任何输入都视为取消。
    /// 返回 `Ok(false)` 表示用户取消
    pub async fn format_drive(&self, fs_type: Filesystem) -> Result<bool, StageError> {
        warn!(path = %self.usb_path.display(), "FORMATTING WILL ERASE ALL DATA");

        print!("Type 'YES' to confirm: ");
        let _ = std::io::stdout().flush();
        let mut confirm = String::new();
        if std::io::stdin().read_line(&mut confirm).is_err()
            || !format_confirmation_accepted(&confirm)
        {
            info!("Format cancelled");
            return Ok(false);
        }

        info!(path = %self.usb_path.display(), fs = fs_type.label(), "Formatting drive");

        let path = self.usb_path.to_string_lossy().to_string();
        let timeout = Duration::from_secs(FORMAT_TIMEOUT_SECS);

        let status = if cfg!(target_os = "windows") {
            let drive = path.trim_end_matches('\\').to_string();
            let fs_arg = format!("/FS:{}", fs_type.label());
            CommandRunner::run_interactive(
                "format",
                &[drive.as_str(), fs_arg.as_str(), "/Q", "/Y"],
                timeout,
            )
            .await
        } else if cfg!(target_os = "linux") {
            // 先卸载，失败忽略（可能本来就没挂载）
            let _ = CommandRunner::run_simple("umount", &[path.as_str()], Duration::from_secs(30))
                .await;
            let mkfs = format!("mkfs.{}", fs_type.mkfs_suffix());
            CommandRunner::run_interactive(&mkfs, &[path.as_str()], timeout).await
        } else if cfg!(target_os = "macos") {
            CommandRunner::run_interactive(
                "diskutil",
                &["eraseDisk", fs_type.label(), "LGTVDOWN", path.as_str()],
                timeout,
            )
            .await
        } else {
            return Err(StageError::UnsupportedPlatform);
        };

        match status {
            Ok(status) if status.success() => {
                info!("Format complete");
                Ok(true)
            }
            Ok(status) => {
                error!(?status, "Format command failed");
                Err(StageError::FormatFailed(format!("exit status {}", status)))
            }
            Err(e) => {
                error!(error = %e, "Format command failed");
                Err(StageError::FormatFailed(e.to_string()))
            }
        }
    }
}

/// 格式化确认必须是精确的 `YES`，大小写敏感
fn format_confirmation_accepted(input: &str) -> bool {
    input.trim() == "YES"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lgtv_stage_{}_{}", name, std::process::id()));
        let _ = std_fs::remove_dir_all(&dir);
        std_fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_prepare_firmware_success() {
        let volume = temp_dir("ok_volume");
        let source_dir = temp_dir("ok_source");
        let firmware = source_dir.join("fw_03.21.30.epk");
        std_fs::write(&firmware, vec![0u8; 4096]).unwrap();

        let stager = UsbStager::new(&volume);
        let dest = stager.prepare_firmware(&firmware).await.unwrap();

        assert_eq!(dest, volume.join("LG_DTV").join("fw_03.21.30.epk"));
        assert_eq!(std_fs::metadata(&dest).unwrap().len(), 4096);

        std_fs::remove_dir_all(&volume).unwrap();
        std_fs::remove_dir_all(&source_dir).unwrap();
    }

    #[tokio::test]
    async fn test_prepare_firmware_is_idempotent() {
        let volume = temp_dir("idem_volume");
        let source_dir = temp_dir("idem_source");
        let firmware = source_dir.join("fw.epk");
        std_fs::write(&firmware, vec![1u8; 2048]).unwrap();

        let stager = UsbStager::new(&volume);
        let first = stager.prepare_firmware(&firmware).await.unwrap();
        let second = stager.prepare_firmware(&firmware).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(std_fs::metadata(&second).unwrap().len(), 2048);

        std_fs::remove_dir_all(&volume).unwrap();
        std_fs::remove_dir_all(&source_dir).unwrap();
    }

    #[tokio::test]
    async fn test_prepare_firmware_source_missing() {
        let volume = temp_dir("nosrc_volume");

        let stager = UsbStager::new(&volume);
        let result = stager
            .prepare_firmware(Path::new("/nonexistent/fw.epk"))
            .await;
        assert!(matches!(result, Err(StageError::SourceMissing(_))));

        std_fs::remove_dir_all(&volume).unwrap();
    }

    #[test]
    fn test_format_confirmation_requires_exact_yes() {
        assert!(format_confirmation_accepted("YES\n"));
        assert!(format_confirmation_accepted("  YES  "));
        assert!(!format_confirmation_accepted("yes\n"));
        assert!(!format_confirmation_accepted("Y\n"));
        assert!(!format_confirmation_accepted(""));
    }

    #[tokio::test]
    async fn test_prepare_firmware_volume_missing() {
        let source_dir = temp_dir("novol_source");
        let firmware = source_dir.join("fw.epk");
        std_fs::write(&firmware, b"x").unwrap();

        let stager = UsbStager::new("/nonexistent/usb");
        let result = stager.prepare_firmware(&firmware).await;
        assert!(matches!(result, Err(StageError::VolumeMissing(_))));

        std_fs::remove_dir_all(&source_dir).unwrap();
    }
}
