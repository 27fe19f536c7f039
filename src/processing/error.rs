//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 处理请求链路的所有失败统一收敛到 `ProcessingError`，
//! 每个分支对应一种用户可理解的失败原因，UI 层可直接展示 `to_string()`。
//! `code()` / `stage()` 提供稳定标识，便于前端分支处理与日志聚合。

/// 网络不可达时的统一提示。
pub const NETWORK_UNREACHABLE_MESSAGE: &str =
    "Unable to reach the server. Please check your connection.";
/// 非 2xx 且无法提取具体原因时的兜底提示。
pub const SERVER_FALLBACK_MESSAGE: &str = "Failed to process image";
/// 响应体中找不到图片时的提示。
pub const EXTRACT_FAILED_MESSAGE: &str = "Could not extract image from server response";

/// 处理请求统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    /// 入参校验失败（缺少提示词、缺少背景图等），不会发起网络请求。
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Network(String),

    /// 超时，文案按模式区分。
    #[error("{0}")]
    Timeout(String),

    /// 服务端返回非 2xx，`message` 提取自 JSON 或 HTML。
    #[error("{message}")]
    Server { status: u16, message: String },

    /// 响应格式无法识别（既不是 PNG，也无法从 HTML 中提取图片）。
    #[error("{0}")]
    ResponseFormat(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}

impl ProcessingError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E_VALIDATION",
            Self::Network(_) => "E_NETWORK",
            Self::Timeout(_) => "E_TIMEOUT",
            Self::Server { .. } => "E_SERVER",
            Self::ResponseFormat(_) => "E_RESPONSE_FORMAT",
            Self::FileSystem(_) => "E_FILE",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::FileSystem(_) => "prepare",
            Self::Network(_) | Self::Timeout(_) => "request",
            Self::Server { .. } => "response",
            Self::ResponseFormat(_) | Self::ResourceLimit(_) => "decode",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<ProcessingError> for String {
    fn from(error: ProcessingError) -> Self {
        error.to_string()
    }
}
