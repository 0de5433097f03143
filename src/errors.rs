//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all client failure modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// The HTTP call itself failed (connection refused, reset, bad status line).
    Transport(String),
    /// The backend answered but reported a failure in its `error` field.
    Api(String),
    /// Console capture control (start, release, output fetch) failure.
    Capture(String),
    /// File-system or terminal I/O failure.
    Io(String),
}

impl AppError {
    /// Message without the category prefix, as shown in the error banner.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Config(msg)
            | Self::Transport(msg)
            | Self::Api(msg)
            | Self::Capture(msg)
            | Self::Io(msg) => msg,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Api(msg) => write!(f, "api: {msg}"),
            Self::Capture(msg) => write!(f, "capture: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Api(format!("invalid response: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
