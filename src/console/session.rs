//! Captured-operation lifecycle.
//!
//! [`SessionCoordinator::run_captured`] brackets an arbitrary async
//! operation with the backend capture handshake:
//!
//! 1. `start_capture` (failure aborts before anything else happens),
//! 2. a background poll task mirroring the buffer into the sink,
//! 3. the operation itself,
//! 4. poll cancellation, `release_capture` and one final flush.
//!
//! Step 4 runs on every exit path of the operation, including a panic.
//! If the whole `run_captured` future is dropped midway, the poll task is
//! cancelled and the release is sent from a detached task.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::backend::ConsoleBackend;
use super::focus::FocusTarget;
use super::sink::OutputSink;
use crate::report::ErrorReporter;
use crate::Result;

/// One in-flight captured operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSession {
    /// Identifier used in logs.
    pub id: Uuid,
    /// When the backend accepted the capture.
    pub started_at: DateTime<Utc>,
}

/// Runs operations under backend console capture.
pub struct SessionCoordinator {
    backend: Arc<dyn ConsoleBackend>,
    sink: Arc<dyn OutputSink>,
    reporter: Arc<dyn ErrorReporter>,
    poll_interval: Duration,
    active: Mutex<Option<CaptureSession>>,
}

/// Shortest accepted poll period; anything below is raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

impl SessionCoordinator {
    /// Coordinator polling `backend` every `poll_interval` into `sink`.
    ///
    /// Non-fatal capture failures go to `reporter`. A `poll_interval` below
    /// [`MIN_POLL_INTERVAL`] is raised to it.
    #[must_use]
    pub fn new(
        backend: Arc<dyn ConsoleBackend>,
        sink: Arc<dyn OutputSink>,
        reporter: Arc<dyn ErrorReporter>,
        poll_interval: Duration,
    ) -> Self {
        if poll_interval < MIN_POLL_INTERVAL {
            warn!(
                requested_ms = poll_interval.as_millis(),
                min_ms = MIN_POLL_INTERVAL.as_millis(),
                "poll interval too short; clamping"
            );
        }
        Self {
            backend,
            sink,
            reporter,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            active: Mutex::new(None),
        }
    }

    /// Period between console polls while a session is active.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Whether a captured operation is in flight.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock_active().is_some()
    }

    /// The in-flight session, if any.
    #[must_use]
    pub fn current_session(&self) -> Option<CaptureSession> {
        self.lock_active().clone()
    }

    /// Run `operation` while streaming captured backend output into the sink.
    ///
    /// `focus` is scrolled into view first when `should_focus` is set; a
    /// failure there is only logged. The operation's result is returned
    /// unchanged once release and the final flush have completed.
    ///
    /// Callers serialise invocations (see [`BusyGate`](super::BusyGate));
    /// overlapping sessions are logged but not rejected.
    ///
    /// # Errors
    ///
    /// Returns the capture-start error without invoking `operation`, or
    /// the error produced by `operation`. Release and flush failures are
    /// reported, never returned.
    pub async fn run_captured<F, Fut, T>(
        &self,
        focus: Option<&dyn FocusTarget>,
        should_focus: bool,
        operation: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if should_focus {
            if let Some(target) = focus {
                if let Err(err) = target.scroll_into_view() {
                    warn!(%err, "failed to bring focus target into view");
                }
            }
        }

        let session_id = Uuid::new_v4();
        async move {
            if let Err(err) = self.backend.start_capture().await {
                warn!(%err, "capture start failed; operation not run");
                return Err(err);
            }

            let mut guard = self.open_session(session_id);
            let poll = PollLoop::spawn(
                Arc::clone(&self.backend),
                Arc::clone(&self.sink),
                self.poll_interval,
            );

            let outcome = AssertUnwindSafe(async move { operation().await })
                .catch_unwind()
                .await;

            poll.stop().await;
            self.release_and_flush().await;
            guard.disarm();
            drop(guard);

            match outcome {
                Ok(result) => {
                    if let Err(ref err) = result {
                        info!(%err, "captured operation failed");
                    } else {
                        info!("captured operation finished");
                    }
                    result
                }
                Err(panic) => {
                    warn!("captured operation panicked");
                    std::panic::resume_unwind(panic)
                }
            }
        }
        .instrument(info_span!("capture_session", %session_id))
        .await
    }

    /// Empty the backend buffer and show the result.
    ///
    /// # Errors
    ///
    /// Returns the clear or fetch failure.
    pub async fn clear(&self) -> Result<()> {
        self.backend.clear().await?;
        let text = self.backend.fetch_output().await?;
        self.sink.write(&text);
        Ok(())
    }

    /// Fetch the buffer once and show it, outside of any session.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure.
    pub async fn refresh(&self) -> Result<()> {
        let text = self.backend.fetch_output().await?;
        self.sink.write(&text);
        Ok(())
    }

    async fn release_and_flush(&self) {
        if let Err(err) = self.backend.release_capture().await {
            warn!(%err, "capture release failed");
            self.reporter.report(&err);
        }

        match self.backend.fetch_output().await {
            Ok(text) => self.sink.write(&text),
            Err(err) => {
                warn!(%err, "final output flush failed");
                self.reporter.report(&err);
            }
        }
    }

    fn open_session(&self, id: Uuid) -> SessionGuard<'_> {
        let mut active = self.lock_active();
        if let Some(previous) = active.as_ref() {
            warn!(previous = %previous.id, "capture started while another session is active");
        }
        *active = Some(CaptureSession {
            id,
            started_at: Utc::now(),
        });
        info!("capture session started");
        SessionGuard {
            coordinator: self,
            id,
            armed: true,
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<CaptureSession>> {
        match self.active.lock() {
            Ok(active) => active,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Clears the active-session slot; releases the capture if dropped armed.
struct SessionGuard<'a> {
    coordinator: &'a SessionCoordinator,
    id: Uuid,
    armed: bool,
}

impl SessionGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        {
            let mut active = self.coordinator.lock_active();
            if active.as_ref().is_some_and(|session| session.id == self.id) {
                *active = None;
            }
        }

        if !self.armed {
            return;
        }

        // The run_captured future was dropped before cleanup ran.
        warn!(session_id = %self.id, "capture session abandoned; releasing in background");
        let backend = Arc::clone(&self.coordinator.backend);
        let reporter = Arc::clone(&self.coordinator.reporter);
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                if let Err(err) = backend.release_capture().await {
                    reporter.report(&err);
                }
            });
        }
    }
}

/// Background task mirroring the capture buffer into the sink.
struct PollLoop {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PollLoop {
    fn spawn(
        backend: Arc<dyn ConsoleBackend>,
        sink: Arc<dyn OutputSink>,
        interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(
            Self::run(backend, sink, interval, cancel.clone()).instrument(debug_span!("console_poll")),
        );
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    async fn run(
        backend: Arc<dyn ConsoleBackend>,
        sink: Arc<dyn OutputSink>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }

            // An in-flight fetch is abandoned on cancellation so nothing is
            // written after the final flush.
            let fetched = tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                fetched = backend.fetch_output() => fetched,
            };

            match fetched {
                Ok(text) => sink.write(&text),
                Err(err) => debug!(%err, "console poll skipped"),
            }
        }
    }

    /// Cancel the task and wait until it has exited.
    async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(%err, "console poll task ended abnormally");
            }
        }
    }
}

impl Drop for PollLoop {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
