use std::net::SocketAddr;
use std::time::Duration;

use super::ProxyError;

pub const ENV_BACKEND_URL: &str = "BACKEND_URL";
pub const ENV_PROXY_ADDR: &str = "AURORA_PROXY_ADDR";

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_PROXY_ADDR: &str = "127.0.0.1:3000";

/// 单次转发的最长耗时，覆盖 4x 放大等慢请求。
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(600);
/// 请求 / 响应体缓冲上限（100MB）。
pub const DEFAULT_MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub backend_url: String,
    pub listen_addr: SocketAddr,
    pub max_duration: Duration,
    pub max_body_bytes: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_duration: DEFAULT_MAX_DURATION,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ProxyConfig {
    /// 读取环境变量覆盖默认值。
    pub fn from_env() -> Result<Self, ProxyError> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(ENV_BACKEND_URL) {
            if !url.trim().is_empty() {
                config.backend_url = url.trim().to_string();
            }
        }

        if let Ok(addr) = std::env::var(ENV_PROXY_ADDR) {
            config.listen_addr = addr
                .trim()
                .parse()
                .map_err(|_| ProxyError::InvalidConfig(format!("{ENV_PROXY_ADDR}={addr} 不是合法的监听地址")))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ProxyError> {
        let url = self.backend_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ProxyError::InvalidConfig(format!(
                "后端地址必须以 http:// 或 https:// 开头: {url}"
            )));
        }
        if self.max_duration.is_zero() {
            return Err(ProxyError::InvalidConfig("max_duration 必须大于 0".to_string()));
        }
        if self.max_body_bytes == 0 {
            return Err(ProxyError::InvalidConfig("max_body_bytes 必须大于 0".to_string()));
        }
        Ok(())
    }

    /// 去掉末尾 `/` 的后端地址。
    pub fn backend_origin(&self) -> &str {
        self.backend_url.trim().trim_end_matches('/')
    }
}
