//! # 处理请求客户端
//!
//! ## 设计思路
//!
//! `ProcessingClient` 负责一次 `POST {base}/process` 的完整往返：
//! 1. 校验请求（不合法直接失败，不发网络）
//! 2. 组装 multipart 表单
//! 3. 在“按模式计算的超时预算”内完成发送与读取响应体
//! 4. 将响应归一化为图片字节或类型化错误
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<ProcessingConfig>>` 支持运行时更新，单次请求使用同一快照。
//! - 超时用 `tokio::time::timeout` 包裹整个往返，到期即丢弃 future（即中止请求）。
//! - 提示头在判定成功/失败之前回调给调用方，不影响结果。
//! - 记录 `request/read/total` 阶段耗时，便于诊断后端慢请求。

use std::sync::{Arc, RwLock};
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use reqwest::multipart::{Form, Part};

use super::error::{EXTRACT_FAILED_MESSAGE, NETWORK_UNREACHABLE_MESSAGE};
use super::html_fallback::HtmlImageDecoder;
use super::mode::{BackgroundQuality, BackgroundType, ProviderHint, TimeoutClass};
use super::request::{ImageFile, ProcessedImage, ProcessingRequest, ResultOrigin};
use super::response::{self, extract_error_message, notice_from_headers};
use super::{ProcessingConfig, ProcessingError};

const BODY_INITIAL_CAPACITY: usize = 64 * 1024;

/// 处理请求客户端。
pub struct ProcessingClient {
    config: Arc<RwLock<ProcessingConfig>>,
    http: RwLock<reqwest::Client>,
    html_decoder: HtmlImageDecoder,
}

impl ProcessingClient {
    /// 根据初始配置创建客户端。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use aurora_ai::processing::{ProcessingClient, ProcessingConfig};
    ///
    /// let client = ProcessingClient::new(ProcessingConfig::default())?;
    /// # Ok::<(), aurora_ai::processing::ProcessingError>(())
    /// ```
    pub fn new(config: ProcessingConfig) -> Result<Self, ProcessingError> {
        config.validate()?;
        let http = Self::build_http_client(&config)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            http: RwLock::new(http),
            html_decoder: HtmlImageDecoder,
        })
    }

    fn build_http_client(config: &ProcessingConfig) -> Result<reqwest::Client, ProcessingError> {
        reqwest::Client::builder()
            .connect_timeout(config.connect_timeout_duration())
            .build()
            .map_err(|e| ProcessingError::Network(format!("HTTP 客户端初始化失败：{e}")))
    }

    /// 获取配置快照。
    pub fn config_snapshot(&self) -> Result<ProcessingConfig, ProcessingError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| ProcessingError::ResourceLimit("配置读取锁已中毒".to_string()))
    }

    /// 整体替换配置，同时重建 HTTP 客户端。
    pub fn set_config(&self, config: ProcessingConfig) -> Result<(), ProcessingError> {
        config.validate()?;
        let http = Self::build_http_client(&config)?;

        {
            let mut guard = self
                .http
                .write()
                .map_err(|_| ProcessingError::ResourceLimit("HTTP 客户端写入锁已中毒".to_string()))?;
            *guard = http;
        }

        let mut guard = self
            .config
            .write()
            .map_err(|_| ProcessingError::ResourceLimit("配置写入锁已中毒".to_string()))?;

        log::info!(
            "⚙️ 已更新处理客户端配置：base_url={} connect_timeout={}s html_fallback={}",
            redact_url_for_log(&config.base_url),
            config.connect_timeout,
            config.html_fallback
        );
        *guard = config;
        Ok(())
    }

    fn http_client(&self) -> Result<reqwest::Client, ProcessingError> {
        self.http
            .read()
            .map(|client| client.clone())
            .map_err(|_| ProcessingError::ResourceLimit("HTTP 客户端读取锁已中毒".to_string()))
    }

    /// 发送处理请求（忽略提示头）。
    pub async fn process(&self, request: ProcessingRequest) -> Result<ProcessedImage, ProcessingError> {
        self.process_with_notice(request, |_| {}).await
    }

    /// 发送处理请求，提示头通过 `on_notice` 回调。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use aurora_ai::processing::{ImageFile, ProcessingClient, ProcessingConfig, ProcessingMode, ProcessingRequest};
    ///
    /// # async fn demo() -> Result<(), aurora_ai::processing::ProcessingError> {
    /// let client = ProcessingClient::new(ProcessingConfig::default())?;
    /// let image = ImageFile::from_path("cat.png", 50 * 1024 * 1024)?;
    /// let result = client
    ///     .process_with_notice(
    ///         ProcessingRequest::new(image, ProcessingMode::RemoveBackground),
    ///         |notice| println!("notice: {notice}"),
    ///     )
    ///     .await?;
    /// assert!(!result.bytes.is_empty());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn process_with_notice<N>(
        &self,
        request: ProcessingRequest,
        on_notice: N,
    ) -> Result<ProcessedImage, ProcessingError>
    where
        N: Fn(&str) + Send + Sync,
    {
        request.validate()?;
        let config = self.config_snapshot()?;
        let http = self.http_client()?;

        let timeout = request.effective_timeout();
        let timeout_class = TimeoutClass::classify(request.mode, request.background_type);
        let url = config.process_url();

        log::info!(
            "🚀 发起处理请求 - mode={} bg_type={} timeout={}ms url={}",
            request.mode.as_str(),
            request.background_type.map(BackgroundType::as_str).unwrap_or("-"),
            timeout.as_millis(),
            redact_url_for_log(&url)
        );

        let total_start = Instant::now();
        let form = build_form(&request)?;

        let exchange = self.exchange(&http, &url, form, &config, timeout_class, &on_notice);
        let result = match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!(
                    "⏱️ 处理请求超时，已中止 - mode={} budget={}ms",
                    request.mode.as_str(),
                    timeout.as_millis()
                );
                Err(ProcessingError::Timeout(timeout_class.message().to_string()))
            }
        };

        match &result {
            Ok(image) => log::info!(
                "✅ 处理完成 - mode={} origin={:?} size={}KB total={}ms",
                request.mode.as_str(),
                image.origin,
                image.bytes.len() / 1024,
                total_start.elapsed().as_millis()
            ),
            Err(err) => log::warn!(
                "❌ 处理失败 - mode={} code={} stage={} total={}ms: {}",
                request.mode.as_str(),
                err.code(),
                err.stage(),
                total_start.elapsed().as_millis(),
                err
            ),
        }

        result
    }

    async fn exchange<N>(
        &self,
        http: &reqwest::Client,
        url: &str,
        form: Form,
        config: &ProcessingConfig,
        timeout_class: TimeoutClass,
        on_notice: &N,
    ) -> Result<ProcessedImage, ProcessingError>
    where
        N: Fn(&str) + Send + Sync,
    {
        let request_start = Instant::now();
        let mut response = http
            .post(url)
            .header(reqwest::header::ACCEPT, "image/png, */*")
            .multipart(form)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, url, timeout_class))?;
        let request_elapsed = request_start.elapsed();

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let notice = notice_from_headers(response.headers());
        if let Some(notice) = notice.as_deref() {
            log::info!("📣 后端提示：{notice}");
            on_notice(notice);
        }

        let read_start = Instant::now();
        let body = read_body_with_limit(&mut response, config.max_response_bytes, url, timeout_class).await?;
        log::debug!(
            "📦 响应读取完成 - status={} content_type={} size={}B request={}ms read={}ms",
            status.as_u16(),
            content_type,
            body.len(),
            request_elapsed.as_millis(),
            read_start.elapsed().as_millis()
        );

        if !status.is_success() {
            return Err(ProcessingError::Server {
                status: status.as_u16(),
                message: extract_error_message(&content_type, &body),
            });
        }

        if response::is_png_content_type(&content_type) {
            return Ok(ProcessedImage {
                bytes: body,
                mime_type: "image/png".to_string(),
                notice,
                origin: ResultOrigin::Binary,
            });
        }

        if !config.html_fallback {
            return Err(ProcessingError::ResponseFormat(EXTRACT_FAILED_MESSAGE.to_string()));
        }

        log::warn!("⚠️ 后端未返回 image/png（{content_type}），使用已弃用的 HTML 兼容解析");
        let html = String::from_utf8_lossy(&body);
        let decoded = self.html_decoder.decode(&html)?;

        Ok(ProcessedImage {
            bytes: decoded.bytes,
            mime_type: decoded.mime_type,
            notice,
            origin: ResultOrigin::HtmlFallback,
        })
    }
}

/// 组装 multipart 表单。
///
/// 有背景图时附带 `background` + `bg_type`；否则若为生成背景，附带提示词与质量。
fn build_form(request: &ProcessingRequest) -> Result<Form, ProcessingError> {
    let mut form = Form::new()
        .part("image", file_part(&request.source_image)?)
        .text("mode", request.mode.as_str());

    if let Some(background) = &request.background_image {
        let bg_type = request.background_type.unwrap_or(BackgroundType::Upload);
        form = form
            .part("background", file_part(background)?)
            .text("bg_type", bg_type.as_str());
    } else if request.background_type == Some(BackgroundType::Generate) {
        let prompt = request
            .background_prompt
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        let quality = request.background_quality.unwrap_or(BackgroundQuality::Fast);

        form = form
            .text("bg_type", BackgroundType::Generate.as_str())
            .text("bg_prompt", prompt)
            .text("bg_quality", quality.as_str());
    }

    if let Some(hint) = request.provider_hint.filter(|hint| *hint != ProviderHint::Auto) {
        form = form.text("bg_provider", hint.as_str());
    }

    Ok(form)
}

fn file_part(file: &ImageFile) -> Result<Part, ProcessingError> {
    Part::bytes(file.bytes.to_vec())
        .file_name(file.file_name.clone())
        .mime_str(&file.mime_type)
        .map_err(|e| ProcessingError::Validation(format!("Invalid image MIME type '{}': {e}", file.mime_type)))
}

/// 分块读取响应体，超过上限立即失败。
async fn read_body_with_limit(
    response: &mut reqwest::Response,
    max_bytes: u64,
    url: &str,
    timeout_class: TimeoutClass,
) -> Result<Bytes, ProcessingError> {
    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(ProcessingError::ResourceLimit(format!(
                "响应过大：{:.2} MB（限制：{:.2} MB）",
                len as f64 / 1024.0 / 1024.0,
                max_bytes as f64 / 1024.0 / 1024.0
            )));
        }
    }

    let mut buffer = BytesMut::with_capacity(BODY_INITIAL_CAPACITY);
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| map_reqwest_error(e, url, timeout_class))?
    {
        if (buffer.len() + chunk.len()) as u64 > max_bytes {
            return Err(ProcessingError::ResourceLimit(format!(
                "响应超过上限 {:.2} MB",
                max_bytes as f64 / 1024.0 / 1024.0
            )));
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(buffer.freeze())
}

/// 统一映射 reqwest 错误到业务错误。
fn map_reqwest_error(e: reqwest::Error, url: &str, timeout_class: TimeoutClass) -> ProcessingError {
    let detail = e.to_string().replace(url, &redact_url_for_log(url));

    if e.is_timeout() {
        log::warn!("⏱️ 底层请求超时：{detail}");
        ProcessingError::Timeout(timeout_class.message().to_string())
    } else {
        log::warn!("🌐 无法连接处理服务：{detail}");
        ProcessingError::Network(NETWORK_UNREACHABLE_MESSAGE.to_string())
    }
}

/// 日志中去掉 query / fragment，避免泄露令牌。
pub(crate) fn redact_url_for_log(url: &str) -> String {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return "<invalid-url>".to_string();
    };

    let mut redacted = format!("{}://{}", parsed.scheme(), parsed.host_str().unwrap_or_default());
    if let Some(port) = parsed.port() {
        redacted.push_str(&format!(":{port}"));
    }
    redacted.push_str(parsed.path());
    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_url_for_log_removes_query_and_fragment() {
        let redacted = redact_url_for_log("https://example.com:8443/api/process?token=abc123#hash");
        assert_eq!(redacted, "https://example.com:8443/api/process");
    }

    #[test]
    fn client_rejects_invalid_base_url() {
        let mut config = ProcessingConfig::default();
        config.base_url = "not a url".to_string();

        assert!(matches!(ProcessingClient::new(config), Err(ProcessingError::Validation(_))));
    }

    #[test]
    fn set_config_replaces_snapshot() {
        let client = ProcessingClient::new(ProcessingConfig::default()).expect("client init failed");

        let mut updated = ProcessingConfig::default();
        updated.base_url = "http://10.0.0.5:8000".to_string();
        updated.html_fallback = false;
        client.set_config(updated).expect("valid config should apply");

        let snapshot = client.config_snapshot().expect("snapshot should succeed");
        assert_eq!(snapshot.base_url, "http://10.0.0.5:8000");
        assert!(!snapshot.html_fallback);
    }
}
