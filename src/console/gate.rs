//! Per-control re-entrancy guard.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

/// Disables one control while its operation is outstanding.
///
/// Activations arriving while the gate is closed are dropped silently.
#[derive(Debug)]
pub struct BusyGate {
    name: &'static str,
    disabled: AtomicBool,
}

/// Re-enables the gate when dropped.
struct GateGuard<'a> {
    gate: &'a BusyGate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.disabled.store(false, Ordering::SeqCst);
        debug!(gate = self.gate.name, "gate released");
    }
}

impl BusyGate {
    /// Enabled gate for the control called `name`.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            disabled: AtomicBool::new(false),
        }
    }

    /// Control name, for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether an operation currently holds the gate.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    /// Run `handler` unless the gate is already closed.
    ///
    /// Returns `None` without calling `handler` when busy. The gate is
    /// re-opened on every exit path, including a panic in `handler` and the
    /// returned future being dropped before completion.
    pub async fn run<F, Fut>(&self, handler: F) -> Option<Fut::Output>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        if self
            .disabled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(gate = self.name, "activation ignored while busy");
            return None;
        }

        let _guard = GateGuard { gate: self };
        debug!(gate = self.name, "gate acquired");
        Some(handler().await)
    }
}
