//! # 图片处理请求模块（processing）
//!
//! ## 设计思路
//!
//! 把“处理意图 → multipart 请求 → 超时控制 → 响应归一化”按职责拆分：
//!
//! - `mode`：模式/背景类型/质量/provider 枚举与按模式的超时预算
//! - `request`：请求与结果模型、入参校验
//! - `config`：客户端配置（地址、连接超时、体积上限、兼容开关）
//! - `client`：单次往返的编排（超时、提示头、阶段耗时日志）
//! - `response`：失败信息提取、内容类型判断（纯函数）
//! - `html_fallback`：已弃用的 HTML 内嵌图片解码（独立、可关闭）
//! - `service`：面向工具的高层 API + 注入的 provider 偏好
//!
//! ## 调用链
//!
//! ```text
//! session / CLI
//!    ↓
//! service.rs（按工具构造请求，补 provider 偏好）
//!    ↓
//! client.rs（校验 → 表单 → timeout(send + read)）
//!    ├─ response.rs（错误信息 / 提示头）
//!    └─ html_fallback.rs（非 PNG 成功响应）
//!    ↓
//! ProcessedImage | ProcessingError
//! ```

mod client;
mod config;
mod error;
pub mod html_fallback;
pub mod mode;
mod request;
mod response;
mod service;

pub use client::ProcessingClient;
pub use config::ProcessingConfig;
pub use error::{
    EXTRACT_FAILED_MESSAGE, NETWORK_UNREACHABLE_MESSAGE, ProcessingError, SERVER_FALLBACK_MESSAGE,
};
pub use html_fallback::{DecodedHtmlImage, HtmlDecodeError, HtmlImageDecoder};
pub use mode::{BackgroundQuality, BackgroundType, ProcessingMode, ProviderHint, TimeoutClass};
pub use request::{ImageFile, ProcessedImage, ProcessingRequest, ResultOrigin};
pub use response::NOTICE_HEADER;
pub use service::{EnhanceScale, ProcessingService};

pub(crate) use client::redact_url_for_log;
