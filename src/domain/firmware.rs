//! 固件领域模型
//!
//! 已知固件版本的静态表与分类逻辑，以及 .epk 文件的粗校验

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::env::constants::MIN_FIRMWARE_SIZE_MB;

/// 已知可 root 的固件版本，按 webOS 大版本分组
pub const ROOTABLE_FIRMWARE: &[(&str, &[&str])] = &[
    ("webOS 4.x", &["4.x.x", "03.21.30", "03.20.14", "03.21.40"]),
    ("webOS 5.x", &["05.00.00", "05.10.00", "05.20.00"]),
    ("webOS 6.x", &["06.00.00", "06.10.00"]),
];

/// 已修补（不可 root）的版本；以 `x` 结尾的条目按前缀匹配
pub const PATCHED_FIRMWARE: &[&str] = &[
    "03.30.10", // May 2022 - original exploit patched
    "03.30.14",
    "03.40.xx",
];

/// 推荐的降级目标版本，对多数型号安全
pub const RECOMMENDED_DOWNGRADE: &str = "03.21.30";

/// 固件版本分类结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    /// 已知可 root
    Rootable,
    /// 漏洞已修补，需要降级
    Patched { recommended: &'static str },
    /// 不在已知表中
    Unknown,
}

/// 检查版本是否在可 root 表中（精确匹配）
pub fn is_rootable(version: &str) -> bool {
    ROOTABLE_FIRMWARE
        .iter()
        .any(|(_, versions)| versions.contains(&version))
}

/// 检查版本是否已修补（支持 `03.40.xx` 形式的前缀通配）
pub fn is_patched(version: &str) -> bool {
    PATCHED_FIRMWARE
        .iter()
        .any(|patched| version.starts_with(patched.trim_end_matches('x')))
}

/// 对固件版本分类
///
/// 可 root 表优先于已修补表，与前缀通配重叠时以精确条目为准
pub fn classify(version: &str) -> Classification {
    if is_rootable(version) {
        Classification::Rootable
    } else if is_patched(version) {
        Classification::Patched {
            recommended: RECOMMENDED_DOWNGRADE,
        }
    } else {
        Classification::Unknown
    }
}

/// 版本所属的 webOS 大版本（如果在已知表中）
pub fn webos_family(version: &str) -> Option<&'static str> {
    ROOTABLE_FIRMWARE
        .iter()
        .find(|(_, versions)| versions.contains(&version))
        .map(|(family, _)| *family)
}

/// 从完整型号中提取基础型号
///
/// `LG-43UP75006LF` -> `43UP75006LF`
pub fn extract_model_base(tv_model: &str) -> String {
    let model = tv_model.to_uppercase();
    let model = model
        .strip_prefix("LG-")
        .or_else(|| model.strip_prefix("LG"))
        .unwrap_or(&model);

    // 取开头的字母数字段（6-15 个字符）
    let base: String = model
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .take(15)
        .collect();

    if base.len() >= 6 {
        base
    } else {
        model.to_string()
    }
}

/// 已知兼容型号表（同一固件可互刷的型号）
pub fn compatible_models(model_base: &str) -> &'static [&'static str] {
    match model_base {
        "43UP75006LF" => &["43NANO75KPA", "43NANO77KPA", "43UP75", "43UP77"],
        "55UP75006LF" => &["55NANO75KPA", "55NANO77KPA", "55UP75", "55UP77"],
        "65UP75006LF" => &["65NANO75KPA", "65NANO77KPA", "65UP75", "65UP77"],
        _ => &[],
    }
}

/// 固件文件校验错误
#[derive(Debug, Error)]
pub enum FirmwareError {
    #[error("firmware file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid firmware format: expected .epk, got {0:?}")]
    InvalidFormat(Option<String>),

    #[error("firmware file seems too small: {0:.1}MB (expected at least {MIN_FIRMWARE_SIZE_MB}MB)")]
    TooSmall(f64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 固件文件：路径、文件名、体积
///
/// 不解析文件内容，校验只有存在性、扩展名和粗略的体积下限
#[derive(Clone, Debug)]
pub struct FirmwareArtifact {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
}

impl FirmwareArtifact {
    /// 校验并构建固件文件描述
    pub fn verify(path: &Path) -> Result<Self, FirmwareError> {
        if !path.exists() {
            return Err(FirmwareError::NotFound(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());
        if extension.as_deref() != Some("epk") {
            return Err(FirmwareError::InvalidFormat(extension));
        }

        let size_bytes = path.metadata()?.len();
        let size_mb = size_bytes as f64 / (1024.0 * 1024.0);
        if size_mb < MIN_FIRMWARE_SIZE_MB as f64 {
            return Err(FirmwareError::TooSmall(size_mb));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            size_bytes,
        })
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_all_rootable_versions_classify_rootable() {
        for (_, versions) in ROOTABLE_FIRMWARE {
            for version in *versions {
                assert_eq!(classify(version), Classification::Rootable, "{}", version);
            }
        }
    }

    #[test]
    fn test_patched_versions_classify_patched() {
        assert_eq!(
            classify("03.30.10"),
            Classification::Patched {
                recommended: "03.21.30"
            }
        );
        assert_eq!(
            classify("03.30.14"),
            Classification::Patched {
                recommended: "03.21.30"
            }
        );
    }

    #[test]
    fn test_prefix_wildcard_matches() {
        // 03.40.xx 按前缀匹配任何 03.40 系列版本
        assert!(is_patched("03.40.21"));
        assert!(is_patched("03.40.90"));
        assert!(!is_patched("03.41.00"));
    }

    #[test]
    fn test_literal_wildcard_entry_is_rootable() {
        // 表中的 4.x.x 是字面条目，按精确匹配
        assert_eq!(classify("4.x.x"), Classification::Rootable);
        assert_eq!(classify("4.1.2"), Classification::Unknown);
    }

    #[test]
    fn test_unknown_version() {
        assert_eq!(classify("99.99.99"), Classification::Unknown);
        assert_eq!(classify(""), Classification::Unknown);
    }

    #[test]
    fn test_webos_family() {
        assert_eq!(webos_family("05.10.00"), Some("webOS 5.x"));
        assert_eq!(webos_family("03.30.10"), None);
    }

    #[test]
    fn test_extract_model_base() {
        assert_eq!(extract_model_base("LG-43UP75006LF"), "43UP75006LF");
        assert_eq!(extract_model_base("lg-43up75006lf"), "43UP75006LF");
        assert_eq!(extract_model_base("OLED65CX6LA"), "OLED65CX6LA");
        // 少于 6 个字母数字时返回原始型号
        assert_eq!(extract_model_base("LG-AB1"), "AB1");
    }

    #[test]
    fn test_compatible_models() {
        assert!(compatible_models("43UP75006LF").contains(&"43NANO75KPA"));
        assert!(compatible_models("UNKNOWN").is_empty());
    }

    #[test]
    fn test_verify_missing_file() {
        let result = FirmwareArtifact::verify(Path::new("/nonexistent/fw.epk"));
        assert!(matches!(result, Err(FirmwareError::NotFound(_))));
    }

    #[test]
    fn test_verify_wrong_extension() {
        let path = std::env::temp_dir().join(format!("lgtv_test_{}.bin", std::process::id()));
        std::fs::File::create(&path).unwrap();

        let result = FirmwareArtifact::verify(&path);
        assert!(matches!(result, Err(FirmwareError::InvalidFormat(_))));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_verify_too_small() {
        let path = std::env::temp_dir().join(format!("lgtv_test_{}.epk", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"not a real firmware").unwrap();

        let result = FirmwareArtifact::verify(&path);
        assert!(matches!(result, Err(FirmwareError::TooSmall(_))));

        std::fs::remove_file(&path).unwrap();
    }
}
