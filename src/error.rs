//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 各子系统各自定义错误枚举（`ProcessingError` / `CompositeError` /
//! `SessionError` / `ProxyError`），在应用边界（CLI、宿主界面）汇总为 `AppError`，
//! 调用方只需处理一种类型。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息，子系统错误通过 `#[from]` 直接 `?` 上抛。
//! - 实现 `Serialize` 将错误序列化为字符串，宿主界面拿到的就是可展示文本。

use serde::Serialize;

use crate::compositing::CompositeError;
use crate::processing::ProcessingError;
use crate::proxy::ProxyError;
use crate::session::SessionError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 远程处理链路错误（校验 / 网络 / 超时 / 服务端 / 响应格式）
    #[error("{0}")]
    Processing(#[from] ProcessingError),

    /// 本地合成、对比、透明度检测错误
    #[error("{0}")]
    Composite(#[from] CompositeError),

    /// 编辑会话状态错误
    #[error("{0}")]
    Session(#[from] SessionError),

    /// 反向代理错误
    #[error("{0}")]
    Proxy(#[from] ProxyError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 偏好读写失败
    #[error("偏好设置错误: {0}")]
    Settings(String),
}

impl AppError {
    /// 稳定错误码，便于界面按类别处理。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Processing(err) => err.code(),
            Self::Composite(_) => "E_COMPOSITE",
            Self::Session(SessionError::Processing(err)) => err.code(),
            Self::Session(_) => "E_SESSION",
            Self::Proxy(_) => "E_PROXY",
            Self::Io(_) => "E_FILE",
            Self::Settings(_) => "E_SETTINGS",
        }
    }
}

/// 宿主界面要求返回值实现 `Serialize`。
/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processing_errors_keep_their_code_and_message() {
        let err: AppError = ProcessingError::Validation("Please upload a background image".to_string()).into();
        assert_eq!(err.code(), "E_VALIDATION");
        assert_eq!(
            serde_json::to_string(&err).expect("serialize"),
            "\"Please upload a background image\""
        );
    }

    #[test]
    fn session_wrapped_processing_error_uses_inner_code() {
        let err: AppError = SessionError::Processing(ProcessingError::Timeout("slow".to_string())).into();
        assert_eq!(err.code(), "E_TIMEOUT");
    }
}
