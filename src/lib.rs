#![forbid(unsafe_code)]

//! Client for the game library manager backend.
//!
//! User actions are sent to the backend HTTP API while its console output
//! is captured and streamed back; see [`console`] for the capture protocol
//! and [`app`] for the actions built on top of it.

pub mod api;
pub mod app;
pub mod config;
pub mod console;
pub mod errors;
pub mod report;

pub use app::{ActionOutcome, App};
pub use config::GlobalConfig;
pub use errors::{AppError, Result};
