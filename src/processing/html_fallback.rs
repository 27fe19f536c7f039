//! # HTML 内嵌图片兼容解析
//!
//! ## 设计思路
//!
//! 旧版后端成功时返回的是一整页 HTML，图片以 `data:image/png;base64,...` 内嵌。
//! 该逻辑属于**已弃用的兼容层**，因此独立成一个解码步骤：
//! - 主成功路径（`Content-Type: image/png`）完全不经过这里
//! - 可通过 `ProcessingConfig::html_fallback` 整体关闭
//! - 输入是字符串、输出是类型化结果，可脱离网络单独测试
//!
//! ## 匹配顺序
//!
//! 1. 裸 `data:image/png;base64,<payload>` 字面量
//! 2. `<img src="data:image/...">` 属性（MIME 取自 data URL 头部）
//! 3. 都没有则失败

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;

use super::ProcessingError;

static PNG_DATA_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)data:image/png;base64,([^"'\s<>]+)"#).expect("静态正则必须可编译")
});

static IMG_DATA_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img[^>]+src=["'](data:image/[^"']+)["']"#).expect("静态正则必须可编译")
});

/// 与浏览器 `atob` 一致：补齐的 `=` 可有可无。
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

static DATA_URL_MIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":(.*?);").expect("静态正则必须可编译"));

/// 从 HTML 中恢复出的图片。
#[derive(Debug, Clone)]
pub struct DecodedHtmlImage {
    pub bytes: Bytes,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HtmlDecodeError {
    #[error("Could not extract image from server response")]
    NoImageFound,

    #[error("Embedded image is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("Embedded data URL is malformed")]
    MalformedDataUrl,
}

impl From<HtmlDecodeError> for ProcessingError {
    fn from(error: HtmlDecodeError) -> Self {
        ProcessingError::ResponseFormat(error.to_string())
    }
}

/// HTML 兼容解码器（无状态）。
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlImageDecoder;

impl HtmlImageDecoder {
    pub fn decode(&self, html: &str) -> Result<DecodedHtmlImage, HtmlDecodeError> {
        if let Some(captures) = PNG_DATA_URL.captures(html) {
            let payload = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            let bytes = decode_base64(payload)?;
            return Ok(DecodedHtmlImage {
                bytes,
                mime_type: "image/png".to_string(),
            });
        }

        if let Some(captures) = IMG_DATA_SRC.captures(html) {
            let data_url = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            if data_url.starts_with("data:") {
                return decode_data_url(data_url);
            }
        }

        Err(HtmlDecodeError::NoImageFound)
    }
}

/// 解析完整 data URL：`data:<mime>;base64,<payload>`。
pub(crate) fn decode_data_url(data_url: &str) -> Result<DecodedHtmlImage, HtmlDecodeError> {
    let (header, payload) = data_url
        .split_once(',')
        .ok_or(HtmlDecodeError::MalformedDataUrl)?;

    let mime_type = DATA_URL_MIME
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|mime| !mime.is_empty())
        .unwrap_or_else(|| "image/png".to_string());

    let bytes = decode_base64(payload)?;
    Ok(DecodedHtmlImage { bytes, mime_type })
}

fn decode_base64(payload: &str) -> Result<Bytes, HtmlDecodeError> {
    let cleaned: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(HtmlDecodeError::InvalidBase64("empty payload".to_string()));
    }

    LENIENT_STANDARD
        .decode(cleaned.as_bytes())
        .map(Bytes::from)
        .map_err(|e| HtmlDecodeError::InvalidBase64(e.to_string()))
}
