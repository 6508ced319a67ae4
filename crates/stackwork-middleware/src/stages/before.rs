//! Run a handler, then continue.

use std::any::type_name;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use stackwork_core::{Context, Handler, Request, ResponseWriter, StackResult};

use crate::middleware::{ContextHandler, ContextMiddleware, Middleware};
use crate::unit::Candidate;

/// Runs a handler, then always continues with `next`.
///
/// This is what [`ChainBuilder::before`](crate::ChainBuilder::before)
/// registers.
pub struct Before<H> {
    handler: H,
    caller: &'static Location<'static>,
}

impl<H: Handler> Before<H> {
    /// Creates the unit.
    #[track_caller]
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            caller: Location::caller(),
        }
    }
}

impl<H: Handler> fmt::Display for Before<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Before {} {}>", type_name::<H>(), self.caller)
    }
}

impl<H: Handler> Middleware for Before<H> {
    fn serve(
        &self,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
        next: &dyn Handler,
    ) -> StackResult<()> {
        self.handler.serve(writer, request)?;
        next.serve(writer, request)
    }

    fn describe(&self) -> Option<String> {
        Some(self.to_string())
    }

    fn injects_context(&self) -> bool {
        self.handler.injects_context()
    }
}

impl<H: Handler> Candidate for Before<H> {
    fn as_middleware(self: Arc<Self>) -> Option<Arc<dyn Middleware>> {
        Some(self)
    }
}

/// Runs a context handler, then always continues with `next`.
pub struct ContextBefore<H> {
    handler: H,
    caller: &'static Location<'static>,
}

impl<H: ContextHandler> ContextBefore<H> {
    /// Creates the unit.
    #[track_caller]
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            caller: Location::caller(),
        }
    }
}

impl<H: ContextHandler> fmt::Display for ContextBefore<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<ContextBefore {} {}>", type_name::<H>(), self.caller)
    }
}

impl<H: ContextHandler> ContextMiddleware for ContextBefore<H> {
    fn serve(
        &self,
        ctx: &Context,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
        next: &dyn Handler,
    ) -> StackResult<()> {
        self.handler.serve(ctx, writer, request)?;
        next.serve(writer, request)
    }

    fn describe(&self) -> Option<String> {
        Some(self.to_string())
    }

    fn name(&self) -> &'static str {
        self.handler.name()
    }
}

impl<H: ContextHandler> Candidate for ContextBefore<H> {
    fn as_context_middleware(self: Arc<Self>) -> Option<Arc<dyn ContextMiddleware>> {
        Some(self)
    }
}
