//! Run a handler after the downstream, whatever happened.

use std::any::type_name;
use std::fmt;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::Arc;

use stackwork_core::{Handler, Request, ResponseWriter, StackResult};

use crate::middleware::Middleware;
use crate::unit::Candidate;

/// Continues with `next`, then always runs a handler.
///
/// The handler also runs when `next` fails or panics. A failure of `next` is
/// returned after the handler ran, and a panic resumes after it.
pub struct Defer<H> {
    handler: H,
    caller: &'static Location<'static>,
}

impl<H: Handler> Defer<H> {
    /// Creates the unit.
    #[track_caller]
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            caller: Location::caller(),
        }
    }
}

impl<H: Handler> fmt::Display for Defer<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Defer {} {}>", type_name::<H>(), self.caller)
    }
}

impl<H: Handler> Middleware for Defer<H> {
    fn serve(
        &self,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
        next: &dyn Handler,
    ) -> StackResult<()> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| next.serve(writer, request)));
        let deferred = self.handler.serve(writer, request);

        match outcome {
            Ok(result) => result.and(deferred),
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    fn describe(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<H: Handler> Candidate for Defer<H> {
    fn as_middleware(self: Arc<Self>) -> Option<Arc<dyn Middleware>> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackwork_core::{empty_request, handler_fn, ResponseBuffer, StackError};

    fn closing() -> Defer<impl Handler> {
        Defer::new(handler_fn(|w, _req| {
            w.write(b";closed");
            Ok(())
        }))
    }

    #[test]
    fn test_runs_after_next() {
        let next = handler_fn(|w, _req| {
            w.write(b"open");
            Ok(())
        });

        let mut buffer = ResponseBuffer::new();
        closing()
            .serve(&mut buffer, &mut empty_request("/"), &next)
            .unwrap();
        assert_eq!(buffer.body_str(), "open;closed");
    }

    #[test]
    fn test_runs_on_failure_and_keeps_error() {
        let next = handler_fn(|_w, _req| Err(StackError::unit_msg("broken pipe")));

        let mut buffer = ResponseBuffer::new();
        let err = closing()
            .serve(&mut buffer, &mut empty_request("/"), &next)
            .unwrap_err();
        assert!(err.to_string().contains("broken pipe"));
        assert_eq!(buffer.body_str(), ";closed");
    }

    #[test]
    fn test_runs_on_panic_and_resumes() {
        let next = handler_fn(|_w, _req| panic!("unit exploded"));
        let unit = closing();
        let mut buffer = ResponseBuffer::new();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            unit.serve(&mut buffer, &mut empty_request("/"), &next)
        }));
        assert!(outcome.is_err());
        assert_eq!(buffer.body_str(), ";closed");
    }
}
