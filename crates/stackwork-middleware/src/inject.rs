//! Context injection.
//!
//! The adapter in this module sits at the outermost edge of a chain. For each
//! request it creates a fresh [`Context`], records an [`Origin`] in it, and
//! hands the rest of the chain a [`ContextWriter`] that carries the store.
//!
//! A writer that already carries a store passes through untouched, so nested
//! use never replaces the outer store. Building a chain that would inject
//! twice is refused up front with [`StackError::DoubleInjection`].

use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use stackwork_core::{
    Context, Handler, Origin, Request, ResponseWriter, SharedHandler, StackError, StackResult,
};

use crate::middleware::Wrapper;
use crate::unit::Candidate;

/// A writer decorator that carries a context store.
///
/// All writer operations go to the wrapped writer.
pub struct ContextWriter<'a> {
    inner: &'a mut dyn ResponseWriter,
    context: Context,
}

impl<'a> ContextWriter<'a> {
    /// Attaches `context` to `inner`.
    pub fn new(inner: &'a mut dyn ResponseWriter, context: Context) -> Self {
        Self { inner, context }
    }

    /// Returns the attached store.
    #[must_use]
    pub fn store(&self) -> &Context {
        &self.context
    }
}

impl ResponseWriter for ContextWriter<'_> {
    fn status(&self) -> Option<StatusCode> {
        self.inner.status()
    }

    fn set_status(&mut self, status: StatusCode) {
        self.inner.set_status(status);
    }

    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write(&mut self, data: &[u8]) {
        self.inner.write(data);
    }

    fn bytes_written(&self) -> usize {
        self.inner.bytes_written()
    }

    fn flush(&mut self) -> bool {
        self.inner.flush()
    }

    fn context(&self) -> Option<Context> {
        Some(self.context.clone())
    }

    fn reclaim(&mut self) -> &mut dyn ResponseWriter {
        self.inner.reclaim()
    }
}

/// A handler that attaches a fresh context store before delegating.
#[derive(Clone)]
pub struct Injected {
    inner: SharedHandler,
}

impl Injected {
    /// Wraps `handler`.
    ///
    /// Wrapping a handler that already injects is harmless at request time
    /// (the inner adapter passes through) but see [`try_wrap`] for the
    /// checked form.
    pub fn new<H: Handler>(handler: H) -> Self {
        Self::shared(Arc::new(handler))
    }

    pub(crate) fn shared(inner: SharedHandler) -> Self {
        Self { inner }
    }
}

impl Handler for Injected {
    fn serve(&self, writer: &mut dyn ResponseWriter, request: &mut Request) -> StackResult<()> {
        if writer.context().is_some() {
            tracing::debug!(
                writer = writer.kind(),
                "context already attached; passing through"
            );
            return self.inner.serve(writer, request);
        }

        let context = Context::new();
        context.set(Origin::new(writer.reclaim().kind()));
        let mut decorated = ContextWriter::new(writer, context);
        self.inner.serve(&mut decorated, request)
    }

    fn describe(&self) -> Option<String> {
        Some("context adapter".to_string())
    }

    fn injects_context(&self) -> bool {
        true
    }
}

impl Candidate for Injected {
    fn as_handler(self: Arc<Self>) -> Option<Arc<dyn Handler>> {
        Some(self)
    }
}

/// Wraps `handler` with the context adapter, refusing handlers that
/// already inject.
///
/// # Errors
///
/// Returns [`StackError::DoubleInjection`] if `handler` already attaches a
/// context store.
pub fn try_wrap<H: Handler>(handler: H) -> StackResult<Injected> {
    if handler.injects_context() {
        return Err(StackError::double_injection(format!(
            "{} already attaches a context store",
            std::any::type_name::<H>()
        )));
    }
    Ok(Injected::new(handler))
}

/// The context adapter as a [`Wrapper`] unit.
///
/// Register it first in a chain; units before it run without a store.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextInjector;

/// Returns the context adapter as a wrapper unit.
#[must_use]
pub const fn context() -> ContextInjector {
    ContextInjector
}

impl Wrapper for ContextInjector {
    fn wrap(&self, next: SharedHandler) -> SharedHandler {
        Arc::new(Injected::shared(next))
    }

    fn describe(&self) -> Option<String> {
        Some("context adapter".to_string())
    }

    fn injects_context(&self) -> bool {
        true
    }
}

impl Candidate for ContextInjector {
    fn as_wrapper(self: Arc<Self>) -> Option<Arc<dyn Wrapper>> {
        Some(self)
    }
}
