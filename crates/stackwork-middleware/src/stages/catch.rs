//! Recover from panics in the downstream.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::Arc;

use stackwork_core::{Handler, Request, ResponseWriter, StackResult};

use crate::middleware::Middleware;
use crate::unit::Candidate;

/// Continues with `next`; if anything downstream panics, calls the recovery
/// function with the panic message instead of unwinding further.
///
/// Output written before the panic stays written.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use stackwork_middleware::stages::Catch;
///
/// let recover = Catch::new(|message, w, _req| {
///     w.set_status(StatusCode::INTERNAL_SERVER_ERROR);
///     w.write(message.as_bytes());
///     Ok(())
/// });
/// # let _ = recover;
/// ```
pub struct Catch<F> {
    on_panic: F,
    caller: &'static Location<'static>,
}

impl<F> Catch<F>
where
    F: Fn(&str, &mut dyn ResponseWriter, &mut Request) -> StackResult<()> + Send + Sync + 'static,
{
    /// Creates the unit.
    #[track_caller]
    pub fn new(on_panic: F) -> Self {
        Self {
            on_panic,
            caller: Location::caller(),
        }
    }
}

impl<F> fmt::Display for Catch<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Catch {}>", self.caller)
    }
}

impl<F> Middleware for Catch<F>
where
    F: Fn(&str, &mut dyn ResponseWriter, &mut Request) -> StackResult<()> + Send + Sync + 'static,
{
    fn serve(
        &self,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
        next: &dyn Handler,
    ) -> StackResult<()> {
        match panic::catch_unwind(AssertUnwindSafe(|| next.serve(writer, request))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(panic = %message, caller = %self.caller, "recovered from panic");
                (self.on_panic)(&message, writer, request)
            }
        }
    }

    fn describe(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<F> Candidate for Catch<F>
where
    F: Fn(&str, &mut dyn ResponseWriter, &mut Request) -> StackResult<()> + Send + Sync + 'static,
{
    fn as_middleware(self: Arc<Self>) -> Option<Arc<dyn Middleware>> {
        Some(self)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
