//! Integration tests for the HTTP request helpers against a mock backend.

use reqwest::Method;
use serde_json::json;

use deck_console::api::endpoints::{
    CreateShortcutData, PlatformsData, ProgramAction, ProgramsData, ShortcutData,
};
use deck_console::console::ConsoleBackend;
use deck_console::AppError;

use super::test_helpers::{spawn_backend, test_client};

#[tokio::test]
async fn request_returns_raw_text() {
    let (base_url, _backend) = spawn_backend().await;
    let client = test_client(&base_url);

    let text = client
        .request(Method::GET, "/api/version", None)
        .await
        .expect("version");
    assert_eq!(text, "1.4.0\n");
    assert_eq!(client.version().await.expect("trimmed version"), "1.4.0");
}

#[tokio::test]
async fn request_json_parses_payload() {
    let (base_url, backend) = spawn_backend().await;
    let client = test_client(&base_url);

    let programs = client.list_programs().await.expect("programs");
    assert_eq!(programs["data"][0]["id"], json!("steam"));
    assert_eq!(backend.calls(), vec!["GET /api/programs"]);
}

#[tokio::test]
async fn error_field_becomes_api_error_with_server_message() {
    let (base_url, backend) = spawn_backend().await;
    backend.fail("/api/roms", "disk full");
    let client = test_client(&base_url);

    let err = client
        .process_roms(&PlatformsData::default())
        .await
        .unwrap_err();
    assert_eq!(err, AppError::Api("disk full".into()));
}

#[tokio::test]
async fn typed_endpoints_hit_expected_routes() {
    let (base_url, backend) = spawn_backend().await;
    let client = test_client(&base_url);
    let data = ProgramsData {
        programs: vec!["retroarch".into()],
        preferences: Vec::new(),
    };

    client.programs(ProgramAction::Remove, &data).await.unwrap();
    client.launch_shortcut("42").await.unwrap();
    client.delete_shortcut("42").await.unwrap();
    client.open_link("https://example.com").await.unwrap();
    client.sync_library().await.unwrap();
    client.shutdown().await.unwrap();

    assert_eq!(
        backend.calls(),
        vec![
            "POST /api/programs/remove",
            "POST /api/shortcut/launch",
            "POST /api/shortcut/modify",
            "POST /api/link/open",
            "POST /api/library/sync",
            "POST /app/shutdown",
        ]
    );
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let client = test_client(&format!("http://{addr}"));
    let err = client
        .request(Method::GET, "/api/version", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn console_control_accepts_plain_text_answers() {
    let (base_url, backend) = spawn_backend().await;
    let client = test_client(&base_url);

    client.start_capture().await.expect("capture");
    assert!(backend.is_capturing());
    client.release_capture().await.expect("release");
    assert!(!backend.is_capturing());
}

#[tokio::test]
async fn console_control_failure_is_a_capture_error() {
    let (base_url, backend) = spawn_backend().await;
    backend.fail("/api/console/capture", "already capturing");
    let client = test_client(&base_url);

    let err = client.start_capture().await.unwrap_err();
    assert_eq!(
        err,
        AppError::Capture("capture start failed: already capturing".into())
    );
}

#[tokio::test]
async fn clear_empties_remote_buffer() {
    let (base_url, backend) = spawn_backend().await;
    let client = test_client(&base_url);

    client.start_capture().await.unwrap();
    client.load_library().await.unwrap();
    assert!(!client.fetch_output().await.unwrap().is_empty());

    client.clear().await.unwrap();
    assert_eq!(client.fetch_output().await.unwrap(), "");
    assert_eq!(backend.buffer(), "");
}

#[tokio::test]
async fn console_output_starting_with_brace_is_returned_verbatim() {
    let (base_url, backend) = spawn_backend().await;
    backend.write_console("{ROM} scanning Nintendo Switch\nfound 3 games\n");
    let client = test_client(&base_url);

    let output = client.fetch_output().await.expect("plain console text");
    assert_eq!(output, "{ROM} scanning Nintendo Switch\nfound 3 games\n");
}

#[tokio::test]
async fn console_output_json_line_without_error_is_returned_verbatim() {
    let (base_url, backend) = spawn_backend().await;
    backend.write_console("{\"level\":\"info\",\"msg\":\"done\"}\n");
    let client = test_client(&base_url);

    let output = client.fetch_output().await.expect("json-looking log line");
    assert_eq!(output, "{\"level\":\"info\",\"msg\":\"done\"}\n");
}

#[tokio::test]
async fn scrape_sends_term_as_query_string() {
    let (base_url, backend) = spawn_backend().await;
    let client = test_client(&base_url);

    client.scrape("Super Mario & Luigi").await.expect("scrape");

    assert_eq!(backend.calls(), vec!["GET /api/scrape"]);
    assert_eq!(
        backend.last_query("/api/scrape").as_deref(),
        Some("term=Super+Mario+%26+Luigi")
    );
}

#[tokio::test]
async fn shortcut_editing_routes_and_payloads() {
    let (base_url, backend) = spawn_backend().await;
    let client = test_client(&base_url);
    let shortcut = ShortcutData {
        id: "42".into(),
        name: "Celeste".into(),
        executable: "/games/celeste/Celeste".into(),
        start_directory: "/games/celeste".into(),
        tags: vec!["Indie".into()],
        ..ShortcutData::default()
    };

    client
        .create_shortcut(&CreateShortcutData {
            name: String::new(),
            path: "/roms/switch/zelda.nsp".into(),
        })
        .await
        .unwrap();
    assert_eq!(
        backend.last_body("/api/shortcut/create"),
        json!({ "name": "", "path": "/roms/switch/zelda.nsp" })
    );

    client.add_shortcut(&shortcut).await.unwrap();
    let added = backend.last_body("/api/shortcut/add");
    assert_eq!(added["id"], json!("42"));
    assert_eq!(added["startDirectory"], json!("/games/celeste"));
    assert_eq!(added["tags"], json!(["Indie"]));
    assert!(added.get("action").is_none());

    client.update_shortcut(&shortcut).await.unwrap();
    let updated = backend.last_body("/api/shortcut/modify");
    assert_eq!(updated["action"], json!("update"));
    assert_eq!(updated["id"], json!("42"));
    assert_eq!(updated["executable"], json!("/games/celeste/Celeste"));
    assert_eq!(updated["heroUrl"], json!(""));

    assert_eq!(
        backend.calls(),
        vec![
            "POST /api/shortcut/create",
            "POST /api/shortcut/add",
            "POST /api/shortcut/modify",
        ]
    );
}
