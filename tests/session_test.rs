mod support;

use aurora_ai::processing::{
    EnhanceScale, ImageFile, NETWORK_UNREACHABLE_MESSAGE, ProcessingConfig, ProcessingService,
};
use aurora_ai::session::{Completion, EditorSession, EditorState, NotificationKind, SessionError, Tool};
use support::{CannedResponse, png_bytes, spawn_server, unused_port};

fn service_for(port: u16) -> ProcessingService {
    ProcessingService::new(ProcessingConfig {
        base_url: format!("http://127.0.0.1:{port}"),
        ..ProcessingConfig::default()
    })
    .expect("service init failed")
}

fn uploaded_session(width: u32, height: u32) -> EditorSession {
    let mut session = EditorSession::new();
    session.upload(ImageFile::from_bytes(png_bytes(width, height, 255), "portrait.jpg.png").expect("valid png"));
    session
}

#[tokio::test]
async fn successful_run_replaces_current_and_notifies() {
    let result_png = png_bytes(8, 8, 255);
    let (addr, server) = spawn_server(
        CannedResponse::png(result_png.clone()).with_header("X-Aurora-Notice", "Upscaled on CPU"),
    );

    let mut session = uploaded_session(4, 4);
    let outcome = session
        .run(
            &Tool::Enhance {
                scale: EnhanceScale::X2,
                advanced: false,
            },
            &service_for(addr.port()),
        )
        .await
        .expect("run should start");
    server.join().expect("server thread failed");

    assert_eq!(outcome, Completion::Applied);
    assert_eq!(session.state(), EditorState::Ready);
    assert_eq!(session.current_image().map(|b| b.to_vec()), Some(result_png));

    let notifications = session.drain_notifications();
    let messages: Vec<_> = notifications.iter().map(|n| (n.kind, n.message.as_str())).collect();
    assert_eq!(
        messages,
        [
            (NotificationKind::Notice, "Upscaled on CPU"),
            (NotificationKind::Success, "Image enhanced successfully!"),
        ]
    );

    let frame = session.enter_compare(Default::default()).expect("compare should succeed");
    assert_eq!(frame.dimensions(), (8, 8));
}

#[tokio::test]
async fn failed_run_keeps_original_and_reports_error() {
    let mut session = uploaded_session(4, 4);
    let original = session.current_image().cloned();

    let outcome = session
        .run(&Tool::RemoveBackground, &service_for(unused_port()))
        .await
        .expect("run should start");

    assert_eq!(outcome, Completion::Failed);
    assert_eq!(session.state(), EditorState::Ready);
    assert_eq!(session.current_image().cloned(), original);

    let notifications = session.drain_notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Error);
    assert_eq!(notifications[0].message, NETWORK_UNREACHABLE_MESSAGE);
}

#[tokio::test]
async fn run_without_upload_is_rejected() {
    let mut session = EditorSession::new();

    let result = session
        .run(&Tool::RemoveBackground, &service_for(unused_port()))
        .await;

    assert!(matches!(result, Err(SessionError::InvalidTransition { .. })));
    assert_eq!(session.state(), EditorState::Empty);
}

#[tokio::test]
async fn saved_download_uses_aurora_suffix() {
    let dir = tempfile::tempdir().expect("tempdir");
    let session = uploaded_session(3, 3);

    let name = session.suggested_download_name();
    assert_eq!(name, "portrait.jpg_aurora.png");

    let path = dir.path().join(&name);
    session.save_current(&path).await.expect("save should succeed");

    let written = std::fs::read(&path).expect("read saved file");
    assert_eq!(Some(written.as_slice()), session.current_image().map(|b| b.as_ref()));
}

#[test]
fn upload_releases_previous_buffers() {
    let mut session = uploaded_session(2, 2);
    let (ticket, _) = session.begin_processing(&Tool::RemoveBackground).expect("begin");
    session.complete(
        ticket,
        Ok(aurora_ai::processing::ProcessedImage {
            bytes: png_bytes(2, 2, 0).into(),
            mime_type: "image/png".to_string(),
            notice: None,
            origin: aurora_ai::processing::ResultOrigin::Binary,
        }),
    );
    assert_eq!(session.chain().live_buffers(), 2);

    session.upload(ImageFile::from_bytes(png_bytes(5, 5, 255), "next.png").expect("valid png"));

    assert_eq!(session.chain().live_buffers(), 1);
    assert_eq!(session.chain().released_count(), 2);
    assert_eq!(session.state(), EditorState::Uploaded);
}
