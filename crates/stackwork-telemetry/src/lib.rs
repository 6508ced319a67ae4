//! Structured logging for stackwork.
//!
//! Units and the host adapter log through `tracing` macros; this crate
//! installs the subscriber that renders those events.
//!
//! - [`init_logging`] installs a `tracing-subscriber` registry with an
//!   [`EnvFilter`](tracing_subscriber::EnvFilter) and a JSON or pretty
//!   formatter.
//!
//! # What gets logged
//!
//! | Event | Level | Fields |
//! |-------|-------|--------|
//! | chain built | `debug` | `units`, `injects`, `location` |
//! | context already attached, adapter passes through | `debug` | - |
//! | value exposes no unit shape | `warn` | `unit` |
//! | request completed (`Trace` unit) | `info` | `chain`, `http.method`, `http.path`, `http.status_code`, `duration_ms` |
//! | request failed (`Trace` unit, host adapter) | `error` | the above without `http.status_code`, plus `error` |
//! | chain panicked (host adapter) | `error` | `error` |
//! | recovered from panic (`Catch` unit) | `error` | `panic`, `caller` |
//!
//! # Example
//!
//! ```rust,ignore
//! use stackwork_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(http.path = "/", "ready");
//! ```

#![doc(html_root_url = "https://docs.rs/stackwork-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
