//! HTTP request helpers for the backend API.
//!
//! Every backend call goes through [`ApiClient::request`] (raw text) or
//! [`ApiClient::request_json`] (parsed JSON with `error`-field detection).

pub mod endpoints;

use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::GlobalConfig;
use crate::{AppError, Result};

/// Thin wrapper over a shared `reqwest` client bound to one backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
}

impl ApiClient {
    /// Build a client for the backend named in `config`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be constructed.
    pub fn new(config: &GlobalConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;
        Ok(Self {
            http,
            base_url: Arc::from(config.base_url.as_str()),
        })
    }

    /// Backend root URL this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a request and return the raw response body.
    ///
    /// The HTTP status is not interpreted here; JSON callers go through
    /// [`request_json`](Self::request_json) which inspects it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the request cannot be sent or the
    /// body cannot be read.
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<String> {
        self.send(method, path, &[], body).await.map(|(_, text)| text)
    }

    /// Issue a request and parse the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` on transport failure and `AppError::Api`
    /// when the payload carries a non-empty `error` field, is not valid JSON,
    /// or the status is an error without any message.
    pub async fn request_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        self.request_json_query(method, path, &[], body).await
    }

    /// [`request_json`](Self::request_json) with `query` pairs appended to the URL.
    pub(crate) async fn request_json_query(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let (status, text) = self.send(method, path, query, body).await?;
        let json = parse_json_response(&text)?;
        if !status.is_success() {
            return Err(AppError::Api(format!("{path} answered with {status}")));
        }
        Ok(json)
    }

    /// Issue a request whose answer may be plain text or a JSON envelope.
    ///
    /// Only a body that parses as a JSON object with a populated `error`
    /// field is treated as a failure envelope; anything else, including
    /// text that merely starts with `{`, is returned as is. Error statuses
    /// fail even when the body is plain text.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` on transport failure and `AppError::Api`
    /// on an error status or populated `error` field.
    pub async fn request_checked(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<String> {
        let (status, text) = self.send(method, path, &[], body).await?;
        if let Ok(json @ Value::Object(_)) = serde_json::from_str::<Value>(&text) {
            if let Some(msg) = error_message(&json) {
                return Err(AppError::Api(msg));
            }
        }
        if !status.is_success() {
            return Err(AppError::Api(format!("{path} answered with {status}")));
        }
        Ok(text)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<(reqwest::StatusCode, String)> {
        let url = format!("{}{path}", self.base_url);
        debug!(%method, %url, "backend request");

        let mut builder = self.http.request(method, &url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "backend returned error status");
        }
        let text = response.text().await?;
        Ok((status, text))
    }
}

/// Parse a backend response body, turning an `error` field into a failure.
///
/// An empty body is treated as `{}`. Any truthy `error` value fails the
/// call: non-empty strings carry their text verbatim, other values are
/// rendered as JSON.
///
/// # Errors
///
/// Returns `AppError::Api` for invalid JSON or a populated `error` field.
pub fn parse_json_response(text: &str) -> Result<Value> {
    let json: Value = if text.trim().is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str(text)?
    };

    match error_message(&json) {
        Some(msg) => Err(AppError::Api(msg)),
        None => Ok(json),
    }
}

/// Message carried by a truthy `error` field, if any.
fn error_message(json: &Value) -> Option<String> {
    match json.get("error") {
        None | Some(Value::Null | Value::Bool(false)) => None,
        Some(Value::String(msg)) if msg.is_empty() => None,
        Some(Value::Number(n)) if n.as_u64() == Some(0) || n.as_i64() == Some(0) => None,
        Some(Value::String(msg)) => Some(msg.clone()),
        Some(other) => Some(other.to_string()),
    }
}
