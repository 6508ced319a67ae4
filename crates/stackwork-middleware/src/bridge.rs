//! Conversions between context-naive and context-aware units.
//!
//! - [`naive`] and [`naive_middleware`] let a plain unit stand where a
//!   context-aware one is expected. The store is ignored.
//! - [`require_context`] and [`require_context_middleware`] let a
//!   context-aware unit stand where a plain one is expected. The store is
//!   recovered from the writer on every request; a writer without one is a
//!   [`StackError::ContextMissing`].

use std::sync::Arc;

use stackwork_core::{Context, Handler, Request, ResponseWriter, StackError, StackResult};

use crate::middleware::{ContextHandler, ContextMiddleware, Middleware};

/// Returns the context store `writer` carries.
///
/// # Errors
///
/// Returns [`StackError::ContextMissing`] if the writer carries no store.
pub fn context_of(writer: &dyn ResponseWriter) -> StackResult<Context> {
    resolve(writer, "stackwork_middleware::bridge::context_of")
}

fn resolve(writer: &dyn ResponseWriter, unit: &'static str) -> StackResult<Context> {
    writer
        .context()
        .ok_or(StackError::ContextMissing { unit })
}

/// A plain unit presented as a context-aware one.
#[derive(Debug, Clone)]
pub struct Naive<T> {
    inner: T,
}

/// Presents `handler` as a [`ContextHandler`] that ignores the store.
pub fn naive<H: Handler>(handler: H) -> Naive<H> {
    Naive { inner: handler }
}

/// Presents `middleware` as a [`ContextMiddleware`] that ignores the store.
pub fn naive_middleware<M: Middleware>(middleware: M) -> Naive<M> {
    Naive { inner: middleware }
}

impl<H: Handler> ContextHandler for Naive<H> {
    fn serve(
        &self,
        _ctx: &Context,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
    ) -> StackResult<()> {
        self.inner.serve(writer, request)
    }

    fn describe(&self) -> Option<String> {
        Handler::describe(&self.inner)
    }
}

impl<M: Middleware> ContextMiddleware for Naive<M> {
    fn serve(
        &self,
        _ctx: &Context,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
        next: &dyn Handler,
    ) -> StackResult<()> {
        self.inner.serve(writer, request, next)
    }

    fn describe(&self) -> Option<String> {
        Middleware::describe(&self.inner)
    }
}

/// A context-aware unit presented as a plain one.
pub struct RequireContext<T: ?Sized> {
    inner: Arc<T>,
}

impl<T: ?Sized> RequireContext<T> {
    pub(crate) fn shared(inner: Arc<T>) -> Self {
        Self { inner }
    }
}

impl<T: ?Sized> Clone for RequireContext<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Presents `handler` as a plain [`Handler`] that reads the store from the
/// writer.
pub fn require_context<H: ContextHandler>(handler: H) -> RequireContext<H> {
    RequireContext::shared(Arc::new(handler))
}

/// Presents `middleware` as a plain [`Middleware`] that reads the store from
/// the writer.
pub fn require_context_middleware<M: ContextMiddleware>(middleware: M) -> RequireContext<M> {
    RequireContext::shared(Arc::new(middleware))
}

impl<H: ContextHandler + ?Sized> Handler for RequireContext<H> {
    fn serve(&self, writer: &mut dyn ResponseWriter, request: &mut Request) -> StackResult<()> {
        let ctx = resolve(writer, self.inner.name())?;
        self.inner.serve(&ctx, writer, request)
    }

    fn describe(&self) -> Option<String> {
        ContextHandler::describe(&*self.inner)
    }
}

impl<M: ContextMiddleware + ?Sized> Middleware for RequireContext<M> {
    fn serve(
        &self,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
        next: &dyn Handler,
    ) -> StackResult<()> {
        let ctx = resolve(writer, self.inner.name())?;
        self.inner.serve(&ctx, writer, request, next)
    }

    fn describe(&self) -> Option<String> {
        ContextMiddleware::describe(&*self.inner)
    }
}
