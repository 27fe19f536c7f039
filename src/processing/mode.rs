//! # 处理模式与参数枚举
//!
//! ## 设计思路
//!
//! 与后端约定的表单取值全部收敛为强类型枚举，每个枚举都提供：
//! - `from_str`：解析外部字符串（大小写、首尾空白不敏感）
//! - `as_str`：输出稳定的线上取值，直接写入 multipart 表单
//!
//! 超时预算同样在这里按“计算量级别”集中定义，避免散落在调用侧。

use std::time::Duration;

use super::ProcessingError;

/// 默认超时：普通请求（去背景、替换背景等）。
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(60_000);
/// 2x 超分辨率。
pub const ENHANCE_2X_TIMEOUT: Duration = Duration::from_millis(120_000);
/// 4x 超分辨率（CPU 上可能需要数分钟）。
pub const ENHANCE_4X_TIMEOUT: Duration = Duration::from_millis(300_000);
/// 文本生成背景（GPU 队列可能繁忙）。
pub const GENERATE_BACKGROUND_TIMEOUT: Duration = Duration::from_millis(180_000);

/// 后端处理模式（multipart 字段 `mode`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    RemoveBackground,
    #[serde(rename = "enhance_2x")]
    Enhance2x,
    #[serde(rename = "enhance_4x")]
    Enhance4x,
    #[serde(rename = "advanced_2x")]
    Advanced2x,
    #[serde(rename = "advanced_4x")]
    Advanced4x,
}

impl ProcessingMode {
    pub const ALL: [ProcessingMode; 5] = [
        Self::RemoveBackground,
        Self::Enhance2x,
        Self::Enhance4x,
        Self::Advanced2x,
        Self::Advanced4x,
    ];

    /// 从外部字符串解析处理模式。
    ///
    /// # 示例
    /// ```rust
    /// use aurora_ai::processing::ProcessingMode;
    ///
    /// let mode = ProcessingMode::from_str("Enhance_4x")?;
    /// assert_eq!(mode.as_str(), "enhance_4x");
    /// # Ok::<(), aurora_ai::processing::ProcessingError>(())
    /// ```
    pub fn from_str(mode: &str) -> Result<Self, ProcessingError> {
        match mode.trim().to_lowercase().as_str() {
            "remove_background" => Ok(Self::RemoveBackground),
            "enhance_2x" => Ok(Self::Enhance2x),
            "enhance_4x" => Ok(Self::Enhance4x),
            "advanced_2x" => Ok(Self::Advanced2x),
            "advanced_4x" => Ok(Self::Advanced4x),
            other => Err(ProcessingError::Validation(format!(
                "Unknown processing mode: {other} (expected remove_background / enhance_2x / enhance_4x / advanced_2x / advanced_4x)"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RemoveBackground => "remove_background",
            Self::Enhance2x => "enhance_2x",
            Self::Enhance4x => "enhance_4x",
            Self::Advanced2x => "advanced_2x",
            Self::Advanced4x => "advanced_4x",
        }
    }

    /// 是否属于 4x 放大（含 advanced 变体）。
    pub fn is_4x(self) -> bool {
        matches!(self, Self::Enhance4x | Self::Advanced4x)
    }

    /// 是否属于 2x 放大（含 advanced 变体）。
    pub fn is_2x(self) -> bool {
        matches!(self, Self::Enhance2x | Self::Advanced2x)
    }
}

/// 背景来源（multipart 字段 `bg_type`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundType {
    Upload,
    Generate,
}

impl BackgroundType {
    pub fn from_str(value: &str) -> Result<Self, ProcessingError> {
        match value.trim().to_lowercase().as_str() {
            "upload" => Ok(Self::Upload),
            "generate" => Ok(Self::Generate),
            other => Err(ProcessingError::Validation(format!(
                "Unknown background type: {other} (expected upload / generate)"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Generate => "generate",
        }
    }
}

/// 生成背景的质量档位（multipart 字段 `bg_quality`）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundQuality {
    #[default]
    Fast,
    Hq,
}

impl BackgroundQuality {
    pub fn from_str(value: &str) -> Result<Self, ProcessingError> {
        match value.trim().to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "hq" => Ok(Self::Hq),
            other => Err(ProcessingError::Validation(format!(
                "Unknown background quality: {other} (expected fast / hq)"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Hq => "hq",
        }
    }
}

/// 背景生成后端的偏好提示（multipart 字段 `bg_provider`）。
///
/// `Auto` 由后端自行选择（OpenVINO 优先，失败回退 LCM）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderHint {
    #[default]
    Auto,
    Openvino,
    Lcm,
}

impl ProviderHint {
    pub fn from_str(value: &str) -> Result<Self, ProcessingError> {
        match value.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "openvino" => Ok(Self::Openvino),
            "lcm" => Ok(Self::Lcm),
            other => Err(ProcessingError::Validation(format!(
                "Unknown provider hint: {other} (expected auto / openvino / lcm)"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Openvino => "openvino",
            Self::Lcm => "lcm",
        }
    }
}

/// 超时场景分类，决定超时后的提示文案。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    Enhance4x,
    Enhance2x,
    GenerateBackground,
    Generic,
}

impl TimeoutClass {
    /// 按“模式优先、再看背景类型”的顺序归类。
    pub fn classify(mode: ProcessingMode, background_type: Option<BackgroundType>) -> Self {
        if mode.is_4x() {
            Self::Enhance4x
        } else if mode.is_2x() {
            Self::Enhance2x
        } else if background_type == Some(BackgroundType::Generate) {
            Self::GenerateBackground
        } else {
            Self::Generic
        }
    }

    /// 面向用户、可操作的超时提示。
    pub fn message(self) -> &'static str {
        match self {
            Self::Enhance4x => {
                "Enhancement timed out. 4x upscaling on CPU can take several minutes for large images. \
                 Please try with a smaller image or use 2x enhancement for faster processing."
            }
            Self::Enhance2x => "Enhancement timed out. Please try again or use a smaller image.",
            Self::GenerateBackground => {
                "Background generation timed out. The GPU queue may be busy. Please try again in a moment."
            }
            Self::Generic => "Request timed out. Please try again.",
        }
    }
}

/// 按模式计算默认超时。
///
/// 生成背景可与任意模式组合，此时取两者预算中较大的一个，
/// 保证每种模式都不低于自身的最低预算。
pub fn default_timeout(mode: ProcessingMode, background_type: Option<BackgroundType>) -> Duration {
    let base = if mode.is_4x() {
        ENHANCE_4X_TIMEOUT
    } else if mode.is_2x() {
        ENHANCE_2X_TIMEOUT
    } else {
        DEFAULT_TIMEOUT
    };

    if background_type == Some(BackgroundType::Generate) {
        return base.max(GENERATE_BACKGROUND_TIMEOUT);
    }

    base
}
