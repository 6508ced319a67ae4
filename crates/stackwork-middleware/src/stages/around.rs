//! Run handlers on both sides of the downstream.

use std::any::type_name;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use stackwork_core::{Handler, Request, ResponseWriter, StackResult};

use super::is_ok_or_unset;
use crate::middleware::Middleware;
use crate::unit::Candidate;

/// Runs `before`, continues with `next`, then runs `after` if the status is
/// `200` or still unset.
pub struct Around<B, A> {
    before: B,
    after: A,
    caller: &'static Location<'static>,
}

impl<B: Handler, A: Handler> Around<B, A> {
    /// Creates the unit.
    #[track_caller]
    pub fn new(before: B, after: A) -> Self {
        Self {
            before,
            after,
            caller: Location::caller(),
        }
    }
}

impl<B: Handler, A: Handler> fmt::Display for Around<B, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Around {} {} {}>",
            type_name::<B>(),
            type_name::<A>(),
            self.caller
        )
    }
}

impl<B: Handler, A: Handler> Middleware for Around<B, A> {
    fn serve(
        &self,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
        next: &dyn Handler,
    ) -> StackResult<()> {
        self.before.serve(writer, request)?;
        next.serve(writer, request)?;
        if is_ok_or_unset(writer) {
            self.after.serve(writer, request)?;
        }
        Ok(())
    }

    fn describe(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<B: Handler, A: Handler> Candidate for Around<B, A> {
    fn as_middleware(self: Arc<Self>) -> Option<Arc<dyn Middleware>> {
        Some(self)
    }
}
