//! Console capture: run backend operations while mirroring their output.
//!
//! [`session::SessionCoordinator`] owns the capture lifecycle,
//! [`gate::BusyGate`] keeps a control from re-entering while its operation
//! is outstanding, and [`sink::OutputSink`] receives the captured text.

pub mod backend;
pub mod focus;
pub mod gate;
pub mod session;
pub mod sink;

pub use backend::ConsoleBackend;
pub use focus::FocusTarget;
pub use gate::BusyGate;
pub use session::SessionCoordinator;
pub use sink::OutputSink;
