//! # 配置模块
//!
//! ## 设计思路
//!
//! 将处理客户端的所有“可调策略”集中到 `ProcessingConfig`：
//! 后端地址、连接超时、响应体积上限、HTML 兼容解析开关等。
//!
//! ## 实现思路
//!
//! - `Default` 提供本地开发可用的配置（走同源 `/api` 代理）。
//! - `from_env` 在默认值上叠加环境变量，非法值记录警告并保持默认。
//! - 按模式的超时预算不在这里配置，见 `mode.rs`。

use std::time::Duration;

use super::ProcessingError;

pub const ENV_API_URL: &str = "AURORA_API_URL";
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "AURORA_CONNECT_TIMEOUT_SECS";
pub const ENV_HTML_FALLBACK: &str = "AURORA_HTML_FALLBACK";

/// 处理客户端配置。
#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    /// API 基地址，请求发往 `{base_url}/process`。
    pub base_url: String,
    /// 建立连接（TCP/TLS）超时时间（秒）。
    pub connect_timeout: u64,
    /// 响应体允许的最大字节数。
    pub max_response_bytes: u64,
    /// 上传文件允许的最大体积（字节）。
    pub max_upload_bytes: u64,
    /// 是否启用 HTML 内嵌图片的兼容解析。
    ///
    /// 旧后端会把结果包在 HTML 页面里返回；关闭后非 PNG 响应一律视为格式错误。
    pub html_fallback: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000/api".to_string(),
            connect_timeout: 10,
            max_response_bytes: 200 * 1024 * 1024,
            max_upload_bytes: 50 * 1024 * 1024,
            html_fallback: true,
        }
    }
}

impl ProcessingConfig {
    /// 默认配置 + 环境变量覆盖。
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(ENV_API_URL) {
            if url.trim().is_empty() {
                log::warn!("⚠️ {ENV_API_URL} 为空，保持默认地址 {}", config.base_url);
            } else {
                config.base_url = url.trim().to_string();
            }
        }

        if let Ok(raw) = std::env::var(ENV_CONNECT_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if (1..=120).contains(&secs) => config.connect_timeout = secs,
                _ => log::warn!("⚠️ {ENV_CONNECT_TIMEOUT_SECS}={raw} 非法（1~120），保持默认"),
            }
        }

        if let Ok(raw) = std::env::var(ENV_HTML_FALLBACK) {
            match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "on" => config.html_fallback = true,
                "0" | "false" | "off" => config.html_fallback = false,
                _ => log::warn!("⚠️ {ENV_HTML_FALLBACK}={raw} 非法，保持默认"),
            }
        }

        config
    }

    /// 校验配置是否可用。
    pub fn validate(&self) -> Result<(), ProcessingError> {
        let parsed = reqwest::Url::parse(&self.base_url).map_err(|e| {
            ProcessingError::Validation(format!("Invalid API base URL '{}': {e}", self.base_url))
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ProcessingError::Validation(format!(
                "Unsupported API URL scheme: {}",
                parsed.scheme()
            )));
        }

        if !(1..=120).contains(&self.connect_timeout) {
            return Err(ProcessingError::Validation(
                "connect_timeout must be between 1 and 120 seconds".to_string(),
            ));
        }

        if self.max_response_bytes < 1024 * 1024 {
            return Err(ProcessingError::Validation(
                "max_response_bytes must be at least 1MB".to_string(),
            ));
        }

        Ok(())
    }

    /// 拼接处理端点地址，兼容 base_url 末尾是否带 `/`。
    pub fn process_url(&self) -> String {
        format!("{}/process", self.base_url.trim_end_matches('/'))
    }

    pub(crate) fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}
