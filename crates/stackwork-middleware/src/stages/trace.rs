//! Request logging.
//!
//! Emits one event per request when the downstream returns:
//!
//! - `info` with method, path, status and duration on success,
//! - `error` with the same fields plus the error on failure.
//!
//! The field names are the ones listed in the `stackwork-telemetry` crate
//! docs; log queries rely on them.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use std::time::Instant;

use http::StatusCode;
use stackwork_core::{Handler, Request, ResponseWriter, StackResult};

use crate::middleware::Middleware;
use crate::unit::Candidate;

/// Logs every request that passes through it.
#[derive(Debug, Clone)]
pub struct Trace {
    label: Option<String>,
    caller: &'static Location<'static>,
}

impl Trace {
    /// Creates the unit.
    #[track_caller]
    #[must_use]
    pub fn new() -> Self {
        Self {
            label: None,
            caller: Location::caller(),
        }
    }

    /// Creates the unit with a label added to every event as `chain`.
    #[track_caller]
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            caller: Location::caller(),
        }
    }
}

impl Default for Trace {
    #[track_caller]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "<Trace {label} {}>", self.caller),
            None => write!(f, "<Trace {}>", self.caller),
        }
    }
}

impl Middleware for Trace {
    fn serve(
        &self,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
        next: &dyn Handler,
    ) -> StackResult<()> {
        let started = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_owned();

        let result = next.serve(writer, request);

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let chain = self.label.as_deref().unwrap_or("");
        match &result {
            Ok(()) => {
                let status = writer.status().unwrap_or(StatusCode::OK).as_u16();
                tracing::info!(
                    chain,
                    http.method = %method,
                    http.path = %path,
                    http.status_code = status,
                    duration_ms,
                    "request completed"
                );
            }
            Err(error) => {
                tracing::error!(
                    chain,
                    http.method = %method,
                    http.path = %path,
                    duration_ms,
                    error = %error,
                    "request failed"
                );
            }
        }

        result
    }

    fn describe(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl Candidate for Trace {
    fn as_middleware(self: Arc<Self>) -> Option<Arc<dyn Middleware>> {
        Some(self)
    }
}
