//! # 编辑器偏好持久化
//!
//! 偏好项只有几个（背景生成 provider、默认质量、对比背景色），
//! 以一份 JSON 文件保存。缺失或损坏的文件一律回退默认值并记录警告，
//! 不阻塞编辑器启动。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::compositing::RgbColor;
use crate::error::AppError;
use crate::processing::{BackgroundQuality, ProviderHint};

/// 默认偏好文件名。
pub const SETTINGS_FILE_NAME: &str = "aurora-settings.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorPreferences {
    pub provider_hint: ProviderHint,
    pub background_quality: BackgroundQuality,
    pub compare_background: RgbColor,
}

/// 偏好存储的抽象，便于在测试中替换为内存实现。
pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> Result<EditorPreferences, AppError>;
    fn save(&self, preferences: &EditorPreferences) -> Result<(), AppError>;
}

/// 基于 JSON 文件的偏好存储。
#[derive(Debug, Clone)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
}

impl JsonFilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 在指定目录下使用默认文件名。
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(SETTINGS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn load(&self) -> Result<EditorPreferences, AppError> {
        if !self.path.exists() {
            return Ok(EditorPreferences::default());
        }

        let content = fs::read_to_string(&self.path)?;
        match serde_json::from_str::<EditorPreferences>(&content) {
            Ok(preferences) => Ok(preferences),
            Err(err) => {
                log::warn!("⚠️ 偏好文件解析失败，使用默认值: {} ({err})", self.path.display());
                Ok(EditorPreferences::default())
            }
        }
    }

    fn save(&self, preferences: &EditorPreferences) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Settings(format!("创建偏好目录失败: {e}")))?;
        }

        let content = serde_json::to_string_pretty(preferences)
            .map_err(|e| AppError::Settings(format!("序列化偏好失败: {e}")))?;
        fs::write(&self.path, content)?;
        log::debug!("💾 偏好已保存：{}", self.path.display());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    inner: RwLock<EditorPreferences>,
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<EditorPreferences, AppError> {
        self.inner
            .read()
            .map(|p| *p)
            .map_err(|_| AppError::Settings("偏好读取锁已中毒".to_string()))
    }

    fn save(&self, preferences: &EditorPreferences) -> Result<(), AppError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| AppError::Settings("偏好写入锁已中毒".to_string()))?;
        *guard = *preferences;
        Ok(())
    }
}
