use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// 设置文件路径环境变量
pub const SETTINGS_VAR: &str = "FAMILY_RATION_SETTINGS";

/// 可调参数（存储连接参数只来自环境变量）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// 变更轮询间隔（毫秒）
    pub change_poll_interval_ms: u64,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            change_poll_interval_ms: 2000,
            request_timeout_secs: 30,
        }
    }
}

impl AppSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.change_poll_interval_ms.max(100))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

pub struct SettingsManager {
    path: PathBuf,
    data: AppSettings,
}

impl SettingsManager {
    /// 读取设置文件；不存在时写入默认值，无法读取或内容损坏时使用默认值
    pub async fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let initial = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<AppSettings>(&bytes).unwrap_or_else(|e| {
                warn!("设置文件 {:?} 解析失败，使用默认值: {}", path, e);
                AppSettings::default()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let default = AppSettings::default();
                let json = serde_json::to_string_pretty(&default)?;
                tokio::fs::write(&path, json).await?;
                default
            }
            Err(e) => {
                warn!("设置文件 {:?} 无法读取，使用默认值: {}", path, e);
                AppSettings::default()
            }
        };

        Ok(Self {
            path,
            data: initial,
        })
    }

    pub fn get(&self) -> &AppSettings {
        &self.data
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// 默认设置文件位置
pub fn default_settings_path() -> PathBuf {
    if let Ok(path) = std::env::var(SETTINGS_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    let base = if cfg!(target_os = "windows") {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata)
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".config")
    };
    base.join("family-ration").join("settings.json")
}
