//! Elements that can be brought into view when a capture starts.

use std::io::Write;
use std::sync::Mutex;

use crate::{AppError, Result};

/// Something the user should be looking at while an operation runs.
pub trait FocusTarget: Send + Sync {
    /// Bring the target into view.
    ///
    /// # Errors
    ///
    /// Returns an error if the view cannot be updated; callers treat this
    /// as non-fatal.
    fn scroll_into_view(&self) -> Result<()>;
}

/// Terminal header printed above a captured operation's output.
pub struct ConsoleHeader<W: Write + Send> {
    label: String,
    out: Mutex<W>,
}

impl<W: Write + Send> ConsoleHeader<W> {
    /// Header announcing `label` on `out`.
    #[must_use]
    pub fn new(label: impl Into<String>, out: W) -> Self {
        Self {
            label: label.into(),
            out: Mutex::new(out),
        }
    }

    /// Consume the header and hand back the writer.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the writer lock was poisoned.
    pub fn into_inner(self) -> Result<W> {
        self.out
            .into_inner()
            .map_err(|_| AppError::Io("console header writer poisoned".into()))
    }
}

impl<W: Write + Send> FocusTarget for ConsoleHeader<W> {
    fn scroll_into_view(&self) -> Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| AppError::Io("console header writer poisoned".into()))?;
        writeln!(out, "==> {}", self.label)?;
        out.flush()?;
        Ok(())
    }
}
