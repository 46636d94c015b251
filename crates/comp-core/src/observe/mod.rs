//! # Observability
//!
//! Structured logging via `tracing`. Library code emits `debug!` events
//! for every model build, filter and sampler run; applications choose the
//! output format with [`init_logging`].
//!
//! ```rust,ignore
//! use comp_core::observe::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development());
//! tracing::info!(transmitters = 64, "decoding started");
//! ```

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
