//! Output sinks rendering captured console text.

use std::io::Write;
use std::sync::Mutex;

use tracing::warn;

/// Destination for captured console text.
///
/// `write` replaces everything previously shown with `text` and leaves the
/// view scrolled to the bottom. Writing the same text twice must leave the
/// view unchanged.
pub trait OutputSink: Send + Sync {
    /// Replace the displayed content with `text`.
    fn write(&self, text: &str);
}

/// Split a console blob into display lines.
///
/// A trailing newline does not produce an empty last line and `\r\n`
/// endings are normalised.
#[must_use]
pub fn render_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_owned).collect()
}

/// Snapshot of a [`BufferSink`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferView {
    /// Rendered lines, oldest first.
    pub lines: Vec<String>,
    /// Index of the first visible line.
    pub scroll_offset: usize,
    /// Number of writes received so far.
    pub writes: u64,
}

/// In-memory view with a fixed viewport height.
#[derive(Debug)]
pub struct BufferSink {
    viewport: usize,
    view: Mutex<BufferView>,
}

impl BufferSink {
    /// Empty view showing `viewport` lines at a time.
    #[must_use]
    pub fn new(viewport: usize) -> Self {
        Self {
            viewport,
            view: Mutex::new(BufferView::default()),
        }
    }

    /// Copy of the current view state.
    #[must_use]
    pub fn snapshot(&self) -> BufferView {
        match self.view.lock() {
            Ok(view) => view.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Displayed text, lines joined with `\n`.
    #[must_use]
    pub fn text(&self) -> String {
        self.snapshot().lines.join("\n")
    }
}

impl OutputSink for BufferSink {
    fn write(&self, text: &str) {
        let mut view = match self.view.lock() {
            Ok(view) => view,
            Err(poisoned) => poisoned.into_inner(),
        };
        view.lines = render_lines(text);
        view.scroll_offset = view.lines.len().saturating_sub(self.viewport);
        view.writes += 1;
    }
}

struct TerminalState<W> {
    out: W,
    shown: String,
}

/// Streams console text to a terminal-like writer.
///
/// A terminal cannot rewrite what it already printed, so only the part
/// extending the previously shown text is emitted. When the backend buffer
/// was cleared or rewritten the whole text is printed again after a marker.
pub struct TerminalSink<W: Write + Send> {
    state: Mutex<TerminalState<W>>,
}

/// Marker printed when the console content no longer extends what was shown.
pub const RESET_MARKER: &str = "-- console reset --";

impl<W: Write + Send> TerminalSink<W> {
    /// Sink writing to `out`.
    #[must_use]
    pub fn new(out: W) -> Self {
        Self {
            state: Mutex::new(TerminalState {
                out,
                shown: String::new(),
            }),
        }
    }

    /// Consume the sink and hand back the writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        match self.state.into_inner() {
            Ok(state) => state.out,
            Err(poisoned) => poisoned.into_inner().out,
        }
    }
}

impl<W: Write + Send> OutputSink for TerminalSink<W> {
    fn write(&self, text: &str) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if state.shown == text {
            return;
        }

        let result = if let Some(delta) = text.strip_prefix(state.shown.as_str()) {
            state.out.write_all(delta.as_bytes())
        } else {
            let out = &mut state.out;
            writeln!(out, "\n{RESET_MARKER}").and_then(|()| out.write_all(text.as_bytes()))
        };

        match result.and_then(|()| state.out.flush()) {
            Ok(()) => text.clone_into(&mut state.shown),
            Err(err) => warn!(%err, "failed to render console output"),
        }
    }
}
