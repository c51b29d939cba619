//! 固件定位服务
//!
//! 在本地缓存目录中查找匹配的 .epk 文件；
//! 未命中时打印手动下载指引（LG 官网需要 JS 和登录，无法抓取）

use std::path::PathBuf;

use tracing::{info, warn};

use crate::domain::firmware;

/// 固件定位器
pub struct FirmwareLocator {
    firmware_dir: PathBuf,
    tv_model: String,
    target_version: String,
}

impl FirmwareLocator {
    pub fn new(firmware_dir: PathBuf, tv_model: &str, target_version: &str) -> Self {
        Self {
            firmware_dir,
            tv_model: tv_model.to_uppercase(),
            target_version: target_version.to_string(),
        }
    }

    /// 查找固件
    ///
    /// 缓存命中返回路径，否则打印下载指引并返回 `None`
    pub fn find(&self) -> anyhow::Result<Option<PathBuf>> {
        std::fs::create_dir_all(&self.firmware_dir)?;

        if let Some(cached) = self.check_cache()? {
            match firmware::FirmwareArtifact::verify(&cached) {
                Ok(artifact) => info!(
                    path = %cached.display(),
                    size_mb = %format!("{:.1}", artifact.size_mb()),
                    "Using cached firmware"
                ),
                // 粗校验失败只警告，文件仍然交给用户判断
                Err(e) => warn!(path = %cached.display(), error = %e, "Cached firmware looks suspicious"),
            }
            return Ok(Some(cached));
        }

        info!(
            model = %self.tv_model,
            version = %self.target_version,
            "Firmware not in cache"
        );
        println!("{}", self.manual_instructions());
        Ok(None)
    }

    /// 检查缓存目录
    ///
    /// 匹配规则：扩展名 .epk 且文件名包含目标版本（大小写不敏感）。
    /// 条目按文件名排序，同一缓存下重复调用结果稳定
    pub fn check_cache(&self) -> anyhow::Result<Option<PathBuf>> {
        let needle = format!("{}.epk", self.target_version.to_lowercase());

        let mut names: Vec<String> = std::fs::read_dir(&self.firmware_dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();

        for name in names {
            let lower = name.to_lowercase();
            if lower.ends_with(".epk") && lower.contains(&needle) {
                return Ok(Some(self.firmware_dir.join(name)));
            }
        }

        Ok(None)
    }

    /// 手动下载指引
    fn manual_instructions(&self) -> String {
        let model_base = firmware::extract_model_base(&self.tv_model);
        let compatible = firmware::compatible_models(&model_base);
        let compatible_note = if compatible.is_empty() {
            String::new()
        } else {
            format!("\nKnown compatible models: {}\n", compatible.join(", "))
        };

        format!(
            r#"
═══════════════════════════════════════════════════════════════
                   FIRMWARE DOWNLOAD GUIDE
═══════════════════════════════════════════════════════════════

Searching for: {model} → {version}

Since firmware downloads require authentication and JavaScript,
please download manually using one of these methods:

OPTION 1: Korean LG Website (Recommended)
────────────────────────────────────────────────────────────
1. Go to: https://www.lge.co.kr/support/product-manuals
2. Translate to English (right-click → Translate)
3. Search for your model: {base}
4. Download firmware version: {version}

OPTION 2: Your Region's LG Website
────────────────────────────────────────────────────────────
1. Go to your region's LG support site
2. Find your TV model's support page
3. Look for "Reference Models" - note compatible models
4. Download the desired firmware

OPTION 3: Telegram Channel
────────────────────────────────────────────────────────────
1. Join: https://t.me/lgwebosusb
2. Search for your TV model
3. Download the firmware file
{compat}
After downloading, place the .epk file in:
{dir}

Then run this utility again.
═══════════════════════════════════════════════════════════════
"#,
            model = self.tv_model,
            version = self.target_version,
            base = model_base,
            compat = compatible_note,
            dir = self.firmware_dir.display(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_cache(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lgtv_cache_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_cache_hit_case_insensitive() {
        let dir = temp_cache("hit");
        fs::write(dir.join("STARFISH-43UP75_03.21.30.EPK"), b"x").unwrap();

        let locator = FirmwareLocator::new(dir.clone(), "LG-43UP75006LF", "03.21.30");
        let found = locator.check_cache().unwrap();
        assert!(found.is_some());
        assert!(found
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with(".EPK"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_cache_miss() {
        let dir = temp_cache("miss");
        fs::write(dir.join("other_03.20.14.epk"), b"x").unwrap();
        fs::write(dir.join("notes_03.21.30.txt"), b"x").unwrap();

        let locator = FirmwareLocator::new(dir.clone(), "LG-43UP75006LF", "03.21.30");
        assert!(locator.check_cache().unwrap().is_none());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let dir = temp_cache("idem");
        fs::write(dir.join("a_03.21.30.epk"), b"x").unwrap();
        fs::write(dir.join("b_03.21.30.epk"), b"x").unwrap();

        let locator = FirmwareLocator::new(dir.clone(), "LG-43UP75006LF", "03.21.30");
        let first = locator.check_cache().unwrap();
        let second = locator.check_cache().unwrap();
        assert_eq!(first, second);

        fs::remove_dir_all(&dir).unwrap();
    }
}
