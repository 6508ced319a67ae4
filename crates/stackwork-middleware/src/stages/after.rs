//! Run a handler after a successful downstream.

use std::any::type_name;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use stackwork_core::{Handler, Request, ResponseWriter, StackResult};

use super::is_ok_or_unset;
use crate::middleware::Middleware;
use crate::unit::Candidate;

/// Continues with `next`, then runs a handler if the response status is
/// `200` or still unset.
///
/// A failing `next` skips the handler and its error is returned.
pub struct After<H> {
    handler: H,
    caller: &'static Location<'static>,
}

impl<H: Handler> After<H> {
    /// Creates the unit.
    #[track_caller]
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            caller: Location::caller(),
        }
    }
}

impl<H: Handler> fmt::Display for After<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<After {} {}>", type_name::<H>(), self.caller)
    }
}

impl<H: Handler> Middleware for After<H> {
    fn serve(
        &self,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
        next: &dyn Handler,
    ) -> StackResult<()> {
        next.serve(writer, request)?;
        if is_ok_or_unset(writer) {
            self.handler.serve(writer, request)?;
        }
        Ok(())
    }

    fn describe(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<H: Handler> Candidate for After<H> {
    fn as_middleware(self: Arc<Self>) -> Option<Arc<dyn Middleware>> {
        Some(self)
    }
}
