//! # 同源反向代理（proxy）
//!
//! 浏览器端只访问同源的 `/api`，由本模块转发到推理后端，
//! 避免跨域并为慢请求（4x 放大最长数分钟）提供足够长的时限。
//!
//! ```text
//! 浏览器 ─POST /api/process─→ proxy ─POST {BACKEND_URL}/process─→ 后端
//!                                └─ GET /api/debug/* ─→ {BACKEND_URL}/api/debug/*
//! ```

mod config;
mod server;

pub use config::{
    DEFAULT_BACKEND_URL, DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_DURATION, DEFAULT_PROXY_ADDR, ENV_BACKEND_URL,
    ENV_PROXY_ADDR, ProxyConfig,
};
pub use server::{PROXY_FAILED_MESSAGE, PROXY_TIMEOUT_MESSAGE, backend_target, router, serve};

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("代理配置无效：{0}")]
    InvalidConfig(String),

    #[error("监听地址绑定失败：{0}")]
    Bind(#[source] std::io::Error),

    #[error("代理服务异常退出：{0}")]
    Serve(#[source] std::io::Error),

    #[error("后端请求失败：{0}")]
    Upstream(String),
}
