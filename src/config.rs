//! Global configuration parsing and validation.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::{AppError, Result};

/// Environment variable overriding the configured backend URL.
pub const BASE_URL_ENV: &str = "DECK_CONSOLE_URL";

/// Console streaming settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ConsoleConfig {
    /// Delay between two captured-output polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Visible line count of the output view; drives the scroll offset.
    #[serde(default = "default_viewport_lines")]
    pub viewport_lines: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            viewport_lines: default_viewport_lines(),
        }
    }
}

/// HTTP transport settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct HttpConfig {
    /// Connect timeout; requests themselves are never timed out.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:14935".into()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_viewport_lines() -> usize {
    40
}

fn default_connect_timeout() -> u64 {
    5
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Backend root URL, without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Console streaming settings.
    #[serde(default)]
    pub console: ConsoleConfig,
    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            console: ConsoleConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and normalize the base URL.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the `DECK_CONSOLE_URL` override when it is set and non-empty.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the overriding URL is invalid.
    pub fn apply_env(&mut self) -> Result<()> {
        match env::var(BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => {
                debug!(url = %url, "base url overridden from environment");
                self.set_base_url(&url)
            }
            _ => Ok(()),
        }
    }

    /// Replace the backend URL, re-running validation.
    ///
    /// The previous URL is kept when the new one is rejected.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the URL is not an `http(s)` URL.
    pub fn set_base_url(&mut self, url: &str) -> Result<()> {
        let previous = std::mem::replace(&mut self.base_url, url.trim().to_owned());
        if let Err(err) = self.validate() {
            self.base_url = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Interval between two output polls.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.console.poll_interval_ms)
    }

    /// Connect timeout for the HTTP client.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http.connect_timeout_seconds)
    }

    fn validate(&mut self) -> Result<()> {
        if self.console.poll_interval_ms == 0 {
            return Err(AppError::Config(
                "console.poll_interval_ms must be greater than zero".into(),
            ));
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }

        let trimmed = self.base_url.trim_end_matches('/').len();
        self.base_url.truncate(trimmed);

        Ok(())
    }
}
