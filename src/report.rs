//! Global error surface.
//!
//! Failures that must not interrupt the current flow (capture release,
//! final flush) and errors escaping a user action end up here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::error;

use crate::AppError;

/// Receives errors for display to the user.
pub trait ErrorReporter: Send + Sync {
    /// Surface `err`.
    fn report(&self, err: &AppError);
}

/// A message currently shown in the banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannerEntry {
    /// Human-readable message, without category prefix.
    pub message: String,
    /// When the error was reported.
    pub raised_at: DateTime<Utc>,
}

/// Banner showing the most recent error until dismissed.
#[derive(Debug, Default)]
pub struct ErrorBanner {
    current: Mutex<Option<BannerEntry>>,
    reported: AtomicU64,
}

impl ErrorBanner {
    /// Empty banner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry currently shown, if any.
    #[must_use]
    pub fn current(&self) -> Option<BannerEntry> {
        match self.current.lock() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Total number of reports received.
    #[must_use]
    pub fn reported_count(&self) -> u64 {
        self.reported.load(Ordering::SeqCst)
    }

    /// Hide the banner.
    pub fn dismiss(&self) {
        match self.current.lock() {
            Ok(mut current) => *current = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

impl ErrorReporter for ErrorBanner {
    fn report(&self, err: &AppError) {
        error!(%err, "error reported");
        let entry = BannerEntry {
            message: err.message().to_owned(),
            raised_at: Utc::now(),
        };
        match self.current.lock() {
            Ok(mut current) => *current = Some(entry),
            Err(poisoned) => *poisoned.into_inner() = Some(entry),
        }
        self.reported.fetch_add(1, Ordering::SeqCst);
    }
}
