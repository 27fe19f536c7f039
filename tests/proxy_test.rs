mod support;

use std::net::SocketAddr;
use std::time::Duration;

use aurora_ai::proxy::{PROXY_FAILED_MESSAGE, PROXY_TIMEOUT_MESSAGE, ProxyConfig, router};
use support::{CannedResponse, png_bytes, spawn_server, unused_port};

async fn start_proxy(backend_port: u16, max_duration: Duration) -> SocketAddr {
    start_proxy_with(ProxyConfig {
        backend_url: format!("http://127.0.0.1:{backend_port}"),
        max_duration,
        ..ProxyConfig::default()
    })
    .await
}

async fn start_proxy_with(config: ProxyConfig) -> SocketAddr {
    let app = router(config).expect("router init failed");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind proxy failed");
    let addr = listener.local_addr().expect("proxy addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

#[tokio::test]
async fn healthz_answers_ok() {
    let proxy = start_proxy(unused_port(), Duration::from_secs(5)).await;

    let body = reqwest::get(format!("http://{proxy}/healthz"))
        .await
        .expect("request failed")
        .text()
        .await
        .expect("body");

    assert_eq!(body, "ok");
}

#[tokio::test]
async fn process_is_forwarded_without_api_prefix() {
    let result_png = png_bytes(3, 3, 0);
    let (backend, server) = spawn_server(
        CannedResponse::png(result_png.clone()).with_header("X-Aurora-Notice", "queued on cpu"),
    );
    let proxy = start_proxy(backend.port(), Duration::from_secs(5)).await;

    let response = reqwest::Client::new()
        .post(format!("http://{proxy}/api/process"))
        .header("Content-Type", "text/plain")
        .body("payload")
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response.headers().get("x-aurora-notice").and_then(|v| v.to_str().ok()),
        Some("queued on cpu")
    );
    assert_eq!(response.bytes().await.expect("body").as_ref(), result_png.as_slice());

    let raw = String::from_utf8_lossy(&server.join().expect("server thread failed")).into_owned();
    assert!(raw.starts_with("POST /process HTTP/1.1"));
    assert!(raw.ends_with("payload"));
}

#[tokio::test]
async fn debug_routes_keep_their_full_path() {
    let (backend, server) = spawn_server(CannedResponse::new(200, "OK", "application/json", "{}"));
    let proxy = start_proxy(backend.port(), Duration::from_secs(5)).await;

    let response = reqwest::get(format!("http://{proxy}/api/debug/memory"))
        .await
        .expect("request failed");
    assert_eq!(response.status().as_u16(), 200);

    let raw = String::from_utf8_lossy(&server.join().expect("server thread failed")).into_owned();
    assert!(raw.starts_with("GET /api/debug/memory HTTP/1.1"));
}

#[tokio::test]
async fn backend_error_status_is_passed_through() {
    let (backend, server) = spawn_server(CannedResponse::new(
        422,
        "Unprocessable Entity",
        "application/json",
        r#"{"detail":"bad input"}"#,
    ));
    let proxy = start_proxy(backend.port(), Duration::from_secs(5)).await;

    let response = reqwest::Client::new()
        .post(format!("http://{proxy}/api/process"))
        .send()
        .await
        .expect("request failed");
    server.join().expect("server thread failed");

    assert_eq!(response.status().as_u16(), 422);
    assert_eq!(response.text().await.expect("body"), r#"{"detail":"bad input"}"#);
}

#[tokio::test]
async fn unreachable_backend_yields_500_json() {
    let proxy = start_proxy(unused_port(), Duration::from_secs(5)).await;

    let response = reqwest::Client::new()
        .post(format!("http://{proxy}/api/process"))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status().as_u16(), 500);
    let body: serde_json::Value =
        serde_json::from_slice(&response.bytes().await.expect("body")).expect("json body");
    assert_eq!(body["error"], PROXY_FAILED_MESSAGE);
}

#[tokio::test]
async fn slow_backend_yields_504_json() {
    let (backend, server) = spawn_server(
        CannedResponse::png(png_bytes(1, 1, 255)).with_delay(Duration::from_millis(1_000)),
    );
    let proxy = start_proxy(backend.port(), Duration::from_millis(200)).await;

    let response = reqwest::Client::new()
        .post(format!("http://{proxy}/api/process"))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status().as_u16(), 504);
    let body: serde_json::Value =
        serde_json::from_slice(&response.bytes().await.expect("body")).expect("json body");
    assert_eq!(body["error"], PROXY_TIMEOUT_MESSAGE);

    server.join().expect("server thread failed");
}

#[tokio::test]
async fn paths_outside_api_yield_404_json() {
    let proxy = start_proxy(unused_port(), Duration::from_secs(5)).await;

    let response = reqwest::get(format!("http://{proxy}/process"))
        .await
        .expect("request failed");

    assert_eq!(response.status().as_u16(), 404);
    let body: serde_json::Value =
        serde_json::from_slice(&response.bytes().await.expect("body")).expect("json body");
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn oversized_request_body_yields_413() {
    let proxy = start_proxy_with(ProxyConfig {
        backend_url: format!("http://127.0.0.1:{}", unused_port()),
        max_body_bytes: 16,
        ..ProxyConfig::default()
    })
    .await;

    let response = reqwest::Client::new()
        .post(format!("http://{proxy}/api/process"))
        .body(vec![b'x'; 64])
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status().as_u16(), 413);
}

#[tokio::test]
async fn oversized_backend_response_yields_500_json() {
    let (backend, server) = spawn_server(CannedResponse::png(vec![0u8; 64]));
    let proxy = start_proxy_with(ProxyConfig {
        backend_url: format!("http://127.0.0.1:{}", backend.port()),
        max_body_bytes: 16,
        ..ProxyConfig::default()
    })
    .await;

    let response = reqwest::Client::new()
        .post(format!("http://{proxy}/api/process"))
        .send()
        .await
        .expect("request failed");
    server.join().expect("server thread failed");

    assert_eq!(response.status().as_u16(), 500);
    let body: serde_json::Value =
        serde_json::from_slice(&response.bytes().await.expect("body")).expect("json body");
    assert_eq!(body["error"], PROXY_FAILED_MESSAGE);
}
