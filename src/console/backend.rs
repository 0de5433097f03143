//! Capture-control seam between the coordinator and the backend.

use std::future::Future;
use std::pin::Pin;

use reqwest::Method;

use crate::api::endpoints::{CONSOLE_CAPTURE, CONSOLE_CLEAR, CONSOLE_OUTPUT, CONSOLE_RELEASE};
use crate::api::ApiClient;
use crate::{AppError, Result};

/// Boxed future returned by [`ConsoleBackend`] methods.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Backend console buffer control.
///
/// The buffer is shared by every request the backend serves while a
/// capture is active; the client only ever reads it.
pub trait ConsoleBackend: Send + Sync {
    /// Redirect backend console output into the capture buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses or cannot be reached.
    fn start_capture(&self) -> BackendFuture<'_, ()>;

    /// Read the whole accumulated output.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn fetch_output(&self) -> BackendFuture<'_, String>;

    /// Restore backend console output to its normal destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses or cannot be reached.
    fn release_capture(&self) -> BackendFuture<'_, ()>;

    /// Empty the capture buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses or cannot be reached.
    fn clear(&self) -> BackendFuture<'_, ()>;
}

fn capture_error(action: &str, err: &AppError) -> AppError {
    AppError::Capture(format!("{action} failed: {}", err.message()))
}

impl ConsoleBackend for ApiClient {
    fn start_capture(&self) -> BackendFuture<'_, ()> {
        Box::pin(async move {
            self.request_checked(Method::POST, CONSOLE_CAPTURE, None)
                .await
                .map_err(|err| capture_error("capture start", &err))?;
            Ok(())
        })
    }

    fn fetch_output(&self) -> BackendFuture<'_, String> {
        Box::pin(async move {
            self.request_checked(Method::GET, CONSOLE_OUTPUT, None)
                .await
                .map_err(|err| capture_error("output fetch", &err))
        })
    }

    fn release_capture(&self) -> BackendFuture<'_, ()> {
        Box::pin(async move {
            self.request_checked(Method::POST, CONSOLE_RELEASE, None)
                .await
                .map_err(|err| capture_error("capture release", &err))?;
            Ok(())
        })
    }

    fn clear(&self) -> BackendFuture<'_, ()> {
        Box::pin(async move {
            self.request_checked(Method::POST, CONSOLE_CLEAR, None)
                .await
                .map_err(|err| capture_error("console clear", &err))?;
            Ok(())
        })
    }
}
