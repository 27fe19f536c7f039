//! # 转发实现
//!
//! ## 实现思路
//!
//! 1. `fallback` 接住所有非 `/healthz` 请求，按路径规则算出后端地址
//! 2. 请求体整体缓冲（上限 `max_body_bytes`），去掉逐跳头后交给 `reqwest`
//! 3. 发送与读取响应体一起包在 `tokio::time::timeout(max_duration)` 里
//! 4. 响应体分块读取，同样受 `max_body_bytes` 限制
//! 5. 状态码、响应头、响应体原样返回；超时 504，连不上或超限 500

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use bytes::BytesMut;

use super::config::ProxyConfig;
use super::ProxyError;
use crate::processing::redact_url_for_log;

pub const PROXY_FAILED_MESSAGE: &str = "Failed to proxy request to backend";
pub const PROXY_TIMEOUT_MESSAGE: &str = "Backend request timed out";

const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HOST,
];

#[derive(Clone)]
struct ProxyState {
    config: Arc<ProxyConfig>,
    http: reqwest::Client,
}

/// 构建代理路由。
pub fn router(config: ProxyConfig) -> Result<Router, ProxyError> {
    config.validate()?;

    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| ProxyError::InvalidConfig(format!("HTTP 客户端初始化失败: {e}")))?;

    let state = ProxyState {
        config: Arc::new(config),
        http,
    };

    Ok(Router::new()
        .route("/healthz", get(healthz))
        .fallback(forward)
        .with_state(state))
}

/// 绑定监听地址并运行代理，直到进程退出。
pub async fn serve(config: ProxyConfig) -> Result<(), ProxyError> {
    let addr = config.listen_addr;
    let backend = config.backend_origin().to_string();
    let app = router(config)?;

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(ProxyError::Bind)?;
    log::info!("🌐 代理已启动：http://{addr} → {}", redact_url_for_log(&backend));

    axum::serve(listener, app).await.map_err(ProxyError::Serve)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

/// 将 `/api/...` 路径映射到后端地址。
///
/// `/api/debug/*` 保留完整路径，其余去掉 `/api` 前缀；不在 `/api` 下的路径返回 `None`。
pub fn backend_target(origin: &str, path: &str, query: Option<&str>) -> Option<String> {
    let mapped = if path.starts_with("/api/debug/") {
        path
    } else {
        path.strip_prefix("/api").filter(|rest| rest.starts_with('/') && rest.len() > 1)?
    };

    Some(match query {
        Some(q) if !q.is_empty() => format!("{origin}{mapped}?{q}"),
        _ => format!("{origin}{mapped}"),
    })
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}

async fn forward(State(state): State<ProxyState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let Some(target) = backend_target(state.config.backend_origin(), parts.uri.path(), parts.uri.query())
    else {
        return json_error(StatusCode::NOT_FOUND, "Not found");
    };

    let body = match axum::body::to_bytes(body, state.config.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            log::warn!("⚠️ 请求体读取失败或超限: {err}");
            return json_error(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
        }
    };

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::CONTENT_LENGTH);

    let start = Instant::now();
    let redacted = redact_url_for_log(&target);
    let exchange = exchange(&state, parts.method.clone(), &target, headers, body);

    match tokio::time::timeout(state.config.max_duration, exchange).await {
        Ok(Ok(response)) => {
            log::info!(
                "🔁 转发完成 - {} {} → {} total={}ms",
                parts.method,
                redacted,
                response.status().as_u16(),
                start.elapsed().as_millis()
            );
            response
        }
        Ok(Err(err)) => {
            log::error!("❌ 转发失败 - {} {}: {err}", parts.method, redacted);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, PROXY_FAILED_MESSAGE)
        }
        Err(_) => {
            log::error!(
                "⏱️ 转发超时 - {} {} 超过 {}s",
                parts.method,
                redacted,
                state.config.max_duration.as_secs()
            );
            json_error(StatusCode::GATEWAY_TIMEOUT, PROXY_TIMEOUT_MESSAGE)
        }
    }
}

async fn exchange(
    state: &ProxyState,
    method: axum::http::Method,
    target: &str,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let mut upstream = state
        .http
        .request(method, target)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| ProxyError::Upstream(e.to_string()))?;

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::CONTENT_LENGTH);

    let bytes = read_upstream_body(&mut upstream, state.config.max_body_bytes).await?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// 分块读取后端响应，超过上限立即放弃。
async fn read_upstream_body(upstream: &mut reqwest::Response, max_bytes: usize) -> Result<Bytes, ProxyError> {
    let too_large = || ProxyError::Upstream(format!("响应体超过 {max_bytes} 字节"));

    if upstream.content_length().is_some_and(|len| len > max_bytes as u64) {
        return Err(too_large());
    }

    let mut buffer = BytesMut::new();
    while let Some(chunk) = upstream
        .chunk()
        .await
        .map_err(|e| ProxyError::Upstream(e.to_string()))?
    {
        if buffer.len() + chunk.len() > max_bytes {
            return Err(too_large());
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(buffer.freeze())
}
