//! USB 驱动器领域模型

use std::path::{Path, PathBuf};

use serde::Serialize;

/// TV 更新器期望的固件目录名
pub const FIRMWARE_DIR_NAME: &str = "LG_DTV";

/// 检测到的 USB 驱动器
#[derive(Clone, Debug, Serialize)]
pub struct UsbDrive {
    /// 挂载点路径
    pub path: PathBuf,
    /// 卷标或设备名
    pub name: Option<String>,
    /// 容量描述（由系统工具报告，未归一化）
    pub size: Option<String>,
}

/// 固件在卷上的目标路径: `<volume>/LG_DTV/<file>`
pub fn staged_path(volume: &Path, firmware_name: &str) -> PathBuf {
    volume.join(FIRMWARE_DIR_NAME).join(firmware_name)
}

/// 格式化目标文件系统
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filesystem {
    Fat32,
    Ntfs,
}

impl Filesystem {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "NTFS" => Filesystem::Ntfs,
            _ => Filesystem::Fat32,
        }
    }

    /// Linux mkfs 后缀 (mkfs.vfat / mkfs.ntfs)
    pub fn mkfs_suffix(&self) -> &'static str {
        match self {
            Filesystem::Fat32 => "vfat",
            Filesystem::Ntfs => "ntfs",
        }
    }

    /// Windows format /FS: 参数 和 macOS diskutil 参数
    pub fn label(&self) -> &'static str {
        match self {
            Filesystem::Fat32 => "FAT32",
            Filesystem::Ntfs => "NTFS",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staged_path() {
        let path = staged_path(Path::new("/media/usb"), "fw_03.21.30.epk");
        assert_eq!(path, PathBuf::from("/media/usb/LG_DTV/fw_03.21.30.epk"));
    }

    #[test]
    fn test_filesystem_from_str() {
        assert_eq!(Filesystem::from_str("ntfs"), Filesystem::Ntfs);
        assert_eq!(Filesystem::from_str("FAT32"), Filesystem::Fat32);
        assert_eq!(Filesystem::from_str("anything"), Filesystem::Fat32);
    }
}
