//! End-to-end capture sessions against the mock backend.

use std::sync::Arc;
use std::time::Duration;

use deck_console::api::endpoints::{ProgramAction, ProgramsData};
use deck_console::console::sink::BufferSink;
use deck_console::console::SessionCoordinator;
use deck_console::report::ErrorBanner;
use deck_console::AppError;

use super::test_helpers::{spawn_backend, test_client, test_config};

#[tokio::test]
async fn slow_operation_output_is_streamed_then_flushed() {
    let (base_url, backend) = spawn_backend().await;
    backend.delay("/api/programs/install", Duration::from_millis(200));
    let client = test_client(&base_url);
    let sink = Arc::new(BufferSink::new(5));
    let banner = Arc::new(ErrorBanner::new());
    let coordinator = SessionCoordinator::new(
        Arc::new(client.clone()),
        sink.clone(),
        banner.clone(),
        test_config(&base_url).poll_interval(),
    );

    let data = ProgramsData {
        programs: vec!["retroarch".into()],
        preferences: Vec::new(),
    };
    let client_ref = &client;
    let sink_ref = &sink;
    let streamed = coordinator
        .run_captured(None, false, || async move {
            client_ref.programs(ProgramAction::Install, &data).await?;
            let streamed = sink_ref.text();
            client_ref.save_library().await?;
            Ok::<_, AppError>(streamed)
        })
        .await
        .expect("captured install");

    assert!(
        streamed.contains("POST /api/programs/install"),
        "install line should be polled before the operation ends, got {streamed:?}"
    );

    assert_eq!(
        sink.snapshot().lines,
        vec!["POST /api/programs/install", "POST /api/library/save"]
    );
    assert!(!backend.is_capturing());
    assert!(banner.current().is_none());

    let calls = backend.calls();
    assert_eq!(calls.first().map(String::as_str), Some("POST /api/console/capture"));
    assert_eq!(
        &calls[calls.len() - 2..],
        &["POST /api/console/release", "GET /api/console/output"]
    );
}

#[tokio::test]
async fn failed_operation_still_releases_capture() {
    let (base_url, backend) = spawn_backend().await;
    backend.fail("/api/state/backup", "disk full");
    let client = test_client(&base_url);
    let sink = Arc::new(BufferSink::new(5));
    let coordinator = SessionCoordinator::new(
        Arc::new(client.clone()),
        sink,
        Arc::new(ErrorBanner::new()),
        test_config(&base_url).poll_interval(),
    );

    let client_ref = &client;
    let err = coordinator
        .run_captured(None, false, || async move {
            client_ref
                .sync_state(
                    deck_console::api::endpoints::StateAction::Backup,
                    &deck_console::api::endpoints::PlatformsData::default(),
                )
                .await
        })
        .await
        .unwrap_err();

    assert_eq!(err.message(), "disk full");
    assert_eq!(backend.count("POST /api/console/release"), 1);
    assert!(!backend.is_capturing());
}
