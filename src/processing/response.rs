//! # 响应解析模块
//!
//! ## 设计思路
//!
//! 后端的响应形态并不统一：
//! - 成功：`image/png` 二进制，或内嵌 base64 图片的 HTML 页面
//! - 失败：JSON `{detail|message}`，或带 `<p>` 错误说明的 HTML 页面
//!
//! 这里只做“字节/文本 → 业务含义”的纯函数转换，不涉及网络，便于单测。

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::SERVER_FALLBACK_MESSAGE;

/// 成功响应附带的运营提示头。
pub const NOTICE_HEADER: &str = "x-aurora-notice";

static HTML_ERROR_PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<p[^>]*>([^<]+)</p>").expect("静态正则必须可编译"));

/// 是否为 PNG 响应（允许带参数、大小写不敏感）。
pub(crate) fn is_png_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("image/png")
}

pub(crate) fn is_html_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("text/html")
}

/// 从失败响应体中提取人类可读的错误信息。
///
/// HTML 取第一个 `<p>` 的文本；其余按 JSON 尝试 `detail`、`message`；
/// 都拿不到时返回兜底文案。
pub(crate) fn extract_error_message(content_type: &str, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);

    if is_html_content_type(content_type) {
        return HTML_ERROR_PARAGRAPH
            .captures(&text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|msg| !msg.is_empty())
            .unwrap_or_else(|| SERVER_FALLBACK_MESSAGE.to_string());
    }

    serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|json| json_message(&json))
        .unwrap_or_else(|| SERVER_FALLBACK_MESSAGE.to_string())
}

/// `detail` 可能是字符串，也可能是 FastAPI 校验错误数组。
fn json_message(json: &serde_json::Value) -> Option<String> {
    for key in ["detail", "message"] {
        match json.get(key) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(serde_json::Value::Array(items)) if !items.is_empty() => {
                let joined = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect::<Vec<_>>()
                    .join("; ");
                if !joined.is_empty() {
                    return Some(joined);
                }
            }
            _ => {}
        }
    }
    None
}

/// 读取并清洗提示头，空白值视为不存在。
pub(crate) fn notice_from_headers(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get(NOTICE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn json_detail_is_surfaced_verbatim() {
        let msg = extract_error_message("application/json", br#"{"detail": "bad input"}"#);
        assert_eq!(msg, "bad input");
    }

    #[test]
    fn json_message_is_used_when_detail_missing() {
        let msg = extract_error_message("application/json", br#"{"message": "model busy"}"#);
        assert_eq!(msg, "model busy");
    }

    #[test]
    fn json_validation_array_is_flattened() {
        let body = br#"{"detail": [{"msg": "field required"}, {"msg": "bad mode"}]}"#;
        assert_eq!(extract_error_message("application/json", body), "field required; bad mode");
    }

    #[test]
    fn html_error_uses_first_paragraph() {
        let html = br#"<html><body><div class="card"><h1>Processing error</h1>
            <p>  Failed to process image. Please try a different file.  </p>
            <p>second</p></div></body></html>"#;
        let msg = extract_error_message("text/html; charset=utf-8", html);
        assert_eq!(msg, "Failed to process image. Please try a different file.");
    }

    #[test]
    fn unparseable_body_falls_back() {
        assert_eq!(extract_error_message("text/plain", b"oops"), SERVER_FALLBACK_MESSAGE);
        assert_eq!(extract_error_message("text/html", b"<h1>no p</h1>"), SERVER_FALLBACK_MESSAGE);
    }

    #[test]
    fn png_content_type_accepts_params() {
        assert!(is_png_content_type("image/png"));
        assert!(is_png_content_type("IMAGE/PNG; charset=binary"));
        assert!(!is_png_content_type("text/html; charset=utf-8"));
    }

    #[test]
    fn blank_notice_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(NOTICE_HEADER, HeaderValue::from_static("   "));
        assert_eq!(notice_from_headers(&headers), None);

        headers.insert(NOTICE_HEADER, HeaderValue::from_static("using fallback provider"));
        assert_eq!(notice_from_headers(&headers).as_deref(), Some("using fallback provider"));
    }
}
