//! Mock backend for integration tests.
//!
//! Serves the console endpoints over a shared in-memory buffer the way the
//! real backend does: while a capture is active, every other request
//! appends a line describing itself to the buffer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;

use deck_console::api::ApiClient;
use deck_console::config::GlobalConfig;

/// Shared state of the mock backend.
#[derive(Default)]
pub struct MockBackend {
    buffer: Mutex<String>,
    capturing: AtomicBool,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, String>>,
    delays: Mutex<HashMap<String, Duration>>,
    requests: Mutex<HashMap<String, (Option<String>, String)>>,
}

impl MockBackend {
    /// Make `path` answer with `{"status":"ERROR","error": message}`.
    pub fn fail(&self, path: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(path.to_owned(), message.to_owned());
    }

    /// Make `path` take `delay` after logging its line.
    pub fn delay(&self, path: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(path.to_owned(), delay);
    }

    /// Every request received, as `METHOD /path`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    pub fn buffer(&self) -> String {
        self.buffer.lock().unwrap().clone()
    }

    /// Append raw text to the console buffer, as backend jobs do.
    pub fn write_console(&self, text: &str) {
        self.buffer.lock().unwrap().push_str(text);
    }

    /// Query string of the last request to `path`.
    pub fn last_query(&self, path: &str) -> Option<String> {
        self.requests
            .lock()
            .unwrap()
            .get(path)
            .and_then(|(query, _)| query.clone())
    }

    /// JSON body of the last request to `path`.
    pub fn last_body(&self, path: &str) -> serde_json::Value {
        let body = self
            .requests
            .lock()
            .unwrap()
            .get(path)
            .map(|(_, body)| body.clone())
            .unwrap_or_default();
        serde_json::from_str(&body).expect("json request body")
    }
}

async fn handle(
    State(state): State<Arc<MockBackend>>,
    method: Method,
    uri: Uri,
    body: String,
) -> Response {
    let path = uri.path().to_owned();
    let call = format!("{method} {path}");
    state.calls.lock().unwrap().push(call.clone());
    state
        .requests
        .lock()
        .unwrap()
        .insert(path.clone(), (uri.query().map(str::to_owned), body));

    let failure = state.failures.lock().unwrap().get(&path).cloned();
    if let Some(message) = failure {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "ERROR", "error": message })),
        )
            .into_response();
    }

    match path.as_str() {
        "/api/console/capture" => {
            state.capturing.store(true, Ordering::SeqCst);
            "OK".into_response()
        }
        "/api/console/release" => {
            state.capturing.store(false, Ordering::SeqCst);
            "OK".into_response()
        }
        "/api/console/output" => state.buffer().into_response(),
        "/api/console/clear" => {
            state.buffer.lock().unwrap().clear();
            "OK".into_response()
        }
        "/api/version" => "1.4.0\n".into_response(),
        "/app/shutdown" => "OK".into_response(),
        _ => {
            if state.is_capturing() {
                state.buffer.lock().unwrap().push_str(&format!("{call}\n"));
            }
            let delay = state.delays.lock().unwrap().get(&path).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if method == Method::GET {
                Json(json!({ "status": "OK", "data": [{ "id": "steam", "name": "Steam" }] }))
                    .into_response()
            } else {
                Json(json!({ "status": "OK" })).into_response()
            }
        }
    }
}

/// Spawn the mock backend on an ephemeral port.
pub async fn spawn_backend() -> (String, Arc<MockBackend>) {
    let state = Arc::new(MockBackend::default());
    let router = Router::new().fallback(handle).with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    (format!("http://{addr}"), state)
}

/// Config pointing at `base_url` with a fast poll interval.
pub fn test_config(base_url: &str) -> GlobalConfig {
    let mut config = GlobalConfig::from_toml_str(
        r"
[console]
poll_interval_ms = 25
viewport_lines = 5
",
    )
    .expect("valid test config");
    config.set_base_url(base_url).expect("valid base url");
    config
}

/// Client for the mock backend at `base_url`.
pub fn test_client(base_url: &str) -> ApiClient {
    ApiClient::new(&test_config(base_url)).expect("http client")
}
