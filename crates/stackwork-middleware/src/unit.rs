//! Unit classification.
//!
//! Every registered value ends up as exactly one [`Unit`]. Typed registration
//! on [`ChainBuilder`](crate::ChainBuilder) picks the variant directly. Values
//! registered without a static shape implement [`Candidate`] and go through
//! [`classify`], which probes the shapes in a fixed precedence order:
//!
//! 1. [`Wrapper`]
//! 2. terminal [`Handler`]
//! 3. [`Middleware`]
//! 4. [`ContextHandler`]
//! 5. [`ContextMiddleware`]
//!
//! The first shape a candidate exposes wins; the decision is made once, at
//! build time.

use std::fmt;
use std::sync::Arc;

use stackwork_core::{
    Handler, NoOp, Request, ResponseWriter, SharedHandler, StackError, StackResult,
};

use crate::bridge::RequireContext;
use crate::middleware::{ContextHandler, ContextMiddleware, Middleware, Wrapper};

/// The five unit shapes a chain accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// Transforms the next handler at build time.
    Wrapper,
    /// Terminal handler; never continues.
    Handler,
    /// Receives the next handler explicitly.
    Middleware,
    /// Terminal handler that receives the context store.
    ContextHandler,
    /// Middleware that receives the context store.
    ContextMiddleware,
}

impl UnitKind {
    /// Returns the kind name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Wrapper => "wrapper",
            Self::Handler => "handler",
            Self::Middleware => "middleware",
            Self::ContextHandler => "context_handler",
            Self::ContextMiddleware => "context_middleware",
        }
    }

    /// Returns `true` for the shapes that need a context store at request time.
    #[must_use]
    pub const fn needs_context(self) -> bool {
        matches!(self, Self::ContextHandler | Self::ContextMiddleware)
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One normalized request-handling unit.
#[derive(Clone)]
pub enum Unit {
    /// See [`Wrapper`].
    Wrapper(Arc<dyn Wrapper>),
    /// See [`Handler`].
    Handler(SharedHandler),
    /// See [`Middleware`].
    Middleware(Arc<dyn Middleware>),
    /// See [`ContextHandler`].
    ContextHandler(Arc<dyn ContextHandler>),
    /// See [`ContextMiddleware`].
    ContextMiddleware(Arc<dyn ContextMiddleware>),
}

impl Unit {
    /// Creates a wrapper unit.
    pub fn wrapper<W: Wrapper>(wrapper: W) -> Self {
        Self::Wrapper(Arc::new(wrapper))
    }

    /// Creates a terminal handler unit.
    pub fn handler<H: Handler>(handler: H) -> Self {
        Self::Handler(Arc::new(handler))
    }

    /// Creates a middleware unit.
    pub fn middleware<M: Middleware>(middleware: M) -> Self {
        Self::Middleware(Arc::new(middleware))
    }

    /// Creates a terminal context handler unit.
    pub fn context_handler<H: ContextHandler>(handler: H) -> Self {
        Self::ContextHandler(Arc::new(handler))
    }

    /// Creates a context middleware unit.
    pub fn context_middleware<M: ContextMiddleware>(middleware: M) -> Self {
        Self::ContextMiddleware(Arc::new(middleware))
    }

    /// Returns the unit's shape.
    #[must_use]
    pub const fn kind(&self) -> UnitKind {
        match self {
            Self::Wrapper(_) => UnitKind::Wrapper,
            Self::Handler(_) => UnitKind::Handler,
            Self::Middleware(_) => UnitKind::Middleware,
            Self::ContextHandler(_) => UnitKind::ContextHandler,
            Self::ContextMiddleware(_) => UnitKind::ContextMiddleware,
        }
    }

    /// Returns the unit's self-description, if it has one.
    #[must_use]
    pub fn describe(&self) -> Option<String> {
        match self {
            Self::Wrapper(w) => w.describe(),
            Self::Handler(h) => h.describe(),
            Self::Middleware(m) => m.describe(),
            Self::ContextHandler(h) => h.describe(),
            Self::ContextMiddleware(m) => m.describe(),
        }
    }

    /// Returns `true` if the unit attaches a context store.
    #[must_use]
    pub fn injects_context(&self) -> bool {
        match self {
            Self::Wrapper(w) => w.injects_context(),
            Self::Handler(h) => h.injects_context(),
            Self::Middleware(m) => m.injects_context(),
            _ => false,
        }
    }

    /// Composes this unit around `next`.
    ///
    /// Terminal shapes drop `next`.
    #[must_use]
    pub fn layer(&self, next: SharedHandler) -> SharedHandler {
        match self {
            Self::Wrapper(w) => w.wrap(next),
            Self::Handler(h) => Arc::clone(h),
            Self::Middleware(m) => Arc::new(Layer {
                middleware: Arc::clone(m),
                next,
            }),
            Self::ContextHandler(h) => Arc::new(RequireContext::shared(Arc::clone(h))),
            Self::ContextMiddleware(m) => Arc::new(Layer {
                middleware: Arc::new(RequireContext::shared(Arc::clone(m))),
                next,
            }),
        }
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Unit").field(&self.kind()).finish()
    }
}

// A middleware bound to the handler it continues to.
struct Layer<M: ?Sized> {
    middleware: Arc<M>,
    next: SharedHandler,
}

impl<M: Middleware + ?Sized> Handler for Layer<M> {
    fn serve(&self, writer: &mut dyn ResponseWriter, request: &mut Request) -> StackResult<()> {
        self.middleware.serve(writer, request, &*self.next)
    }
}

/// Debug record of one unit of a compiled chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    kind: UnitKind,
    type_name: &'static str,
    description: Option<String>,
}

impl Descriptor {
    /// Creates a descriptor for `unit`, registered as a value of `type_name`.
    #[must_use]
    pub fn new(unit: &Unit, type_name: &'static str) -> Self {
        Self {
            kind: unit.kind(),
            type_name,
            description: unit.describe(),
        }
    }

    /// Unit shape.
    #[must_use]
    pub const fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Rust type name of the registered value.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Self-description reported by the unit.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.type_name)?;
        if let Some(description) = &self.description {
            write!(f, " = {description}")?;
        }
        Ok(())
    }
}

/// A value offered for registration without a static shape.
///
/// Each probe returns the value as one shape, or `None` if it does not have
/// that shape. Implement only the probes that apply.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use stackwork_core::{Handler, Request, ResponseWriter, StackResult};
/// use stackwork_middleware::{classify, Candidate, UnitKind};
///
/// struct Health;
///
/// impl Handler for Health {
///     fn serve(&self, w: &mut dyn ResponseWriter, _req: &mut Request) -> StackResult<()> {
///         w.write(b"ok");
///         Ok(())
///     }
/// }
///
/// impl Candidate for Health {
///     fn as_handler(self: Arc<Self>) -> Option<Arc<dyn Handler>> {
///         Some(self)
///     }
/// }
///
/// let (unit, descriptor) = classify(Arc::new(Health), "Health").unwrap();
/// assert_eq!(unit.kind(), UnitKind::Handler);
/// assert_eq!(descriptor.type_name(), "Health");
/// ```
pub trait Candidate: Send + Sync + 'static {
    /// Probes the wrapper shape.
    fn as_wrapper(self: Arc<Self>) -> Option<Arc<dyn Wrapper>> {
        None
    }

    /// Probes the terminal handler shape.
    fn as_handler(self: Arc<Self>) -> Option<Arc<dyn Handler>> {
        None
    }

    /// Probes the middleware shape.
    fn as_middleware(self: Arc<Self>) -> Option<Arc<dyn Middleware>> {
        None
    }

    /// Probes the terminal context handler shape.
    fn as_context_handler(self: Arc<Self>) -> Option<Arc<dyn ContextHandler>> {
        None
    }

    /// Probes the context middleware shape.
    fn as_context_middleware(self: Arc<Self>) -> Option<Arc<dyn ContextMiddleware>> {
        None
    }

    /// Short human-readable description, used in chain debug listings.
    fn describe(&self) -> Option<String> {
        None
    }
}

impl Candidate for NoOp {
    fn as_handler(self: Arc<Self>) -> Option<Arc<dyn Handler>> {
        Some(self)
    }
}

/// Converts one registered value into a [`Unit`].
///
/// `type_name` names the value in errors and debug listings.
///
/// # Errors
///
/// - [`StackError::UnsupportedUnitKind`] if the value exposes no shape.
/// - [`StackError::DoubleInjection`] if the value is a handler that already
///   attaches a context store.
pub fn classify(
    candidate: Arc<dyn Candidate>,
    type_name: &'static str,
) -> StackResult<(Unit, Descriptor)> {
    let description = candidate.describe();

    let unit = if let Some(wrapper) = Arc::clone(&candidate).as_wrapper() {
        Unit::Wrapper(wrapper)
    } else if let Some(handler) = Arc::clone(&candidate).as_handler() {
        if handler.injects_context() {
            return Err(StackError::double_injection(format!(
                "{type_name} already attaches a context store and cannot be embedded"
            )));
        }
        Unit::Handler(handler)
    } else if let Some(middleware) = Arc::clone(&candidate).as_middleware() {
        Unit::Middleware(middleware)
    } else if let Some(handler) = Arc::clone(&candidate).as_context_handler() {
        Unit::ContextHandler(handler)
    } else if let Some(middleware) = candidate.as_context_middleware() {
        Unit::ContextMiddleware(middleware)
    } else {
        tracing::warn!(unit = type_name, "value exposes no unit shape");
        return Err(StackError::UnsupportedUnitKind { type_name });
    };

    let mut descriptor = Descriptor::new(&unit, type_name);
    if descriptor.description.is_none() {
        descriptor.description = description;
    }
    Ok((unit, descriptor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackwork_core::{empty_request, handler_fn, Context, ResponseBuffer};

    struct Opaque;
    impl Candidate for Opaque {}

    // Exposes every shape, so the classifier must pick by precedence.
    struct Everything;

    impl Handler for Everything {
        fn serve(&self, w: &mut dyn ResponseWriter, _req: &mut Request) -> StackResult<()> {
            w.write(b"handler");
            Ok(())
        }
    }

    impl Middleware for Everything {
        fn serve(
            &self,
            w: &mut dyn ResponseWriter,
            req: &mut Request,
            next: &dyn Handler,
        ) -> StackResult<()> {
            w.write(b"middleware;");
            next.serve(w, req)
        }
    }

    impl ContextHandler for Everything {
        fn serve(
            &self,
            _ctx: &Context,
            w: &mut dyn ResponseWriter,
            _req: &mut Request,
        ) -> StackResult<()> {
            w.write(b"context handler");
            Ok(())
        }
    }

    impl ContextMiddleware for Everything {
        fn serve(
            &self,
            _ctx: &Context,
            w: &mut dyn ResponseWriter,
            req: &mut Request,
            next: &dyn Handler,
        ) -> StackResult<()> {
            w.write(b"context middleware;");
            next.serve(w, req)
        }
    }

    struct Shapes {
        handler: bool,
        middleware: bool,
        context_handler: bool,
        context_middleware: bool,
    }

    impl Candidate for Shapes {
        fn as_handler(self: Arc<Self>) -> Option<Arc<dyn Handler>> {
            self.handler.then(|| Arc::new(Everything) as Arc<dyn Handler>)
        }

        fn as_middleware(self: Arc<Self>) -> Option<Arc<dyn Middleware>> {
            self.middleware
                .then(|| Arc::new(Everything) as Arc<dyn Middleware>)
        }

        fn as_context_handler(self: Arc<Self>) -> Option<Arc<dyn ContextHandler>> {
            self.context_handler
                .then(|| Arc::new(Everything) as Arc<dyn ContextHandler>)
        }

        fn as_context_middleware(self: Arc<Self>) -> Option<Arc<dyn ContextMiddleware>> {
            self.context_middleware
                .then(|| Arc::new(Everything) as Arc<dyn ContextMiddleware>)
        }

        fn describe(&self) -> Option<String> {
            Some("shapes".to_string())
        }
    }

    fn shapes(handler: bool, middleware: bool, context_handler: bool, context_middleware: bool) -> Arc<Shapes> {
        Arc::new(Shapes {
            handler,
            middleware,
            context_handler,
            context_middleware,
        })
    }

    #[test]
    fn test_no_shape_is_unsupported() {
        let err = classify(Arc::new(Opaque), "Opaque").unwrap_err();
        assert!(matches!(
            err,
            StackError::UnsupportedUnitKind { type_name: "Opaque" }
        ));
    }

    #[test]
    fn test_precedence() {
        let cases = [
            (shapes(true, true, true, true), UnitKind::Handler),
            (shapes(false, true, true, true), UnitKind::Middleware),
            (shapes(false, false, true, true), UnitKind::ContextHandler),
            (shapes(false, false, false, true), UnitKind::ContextMiddleware),
        ];

        for (candidate, expected) in cases {
            let (unit, descriptor) = classify(candidate, "Shapes").unwrap();
            assert_eq!(unit.kind(), expected);
            assert_eq!(descriptor.kind(), expected);
            assert_eq!(descriptor.description(), Some("shapes"));
        }
    }

    #[test]
    fn test_wrapper_wins_over_everything() {
        struct Both;
        impl Candidate for Both {
            fn as_wrapper(self: Arc<Self>) -> Option<Arc<dyn Wrapper>> {
                Some(Arc::new(|next: SharedHandler| next))
            }
            fn as_handler(self: Arc<Self>) -> Option<Arc<dyn Handler>> {
                Some(Arc::new(NoOp))
            }
        }

        let (unit, _) = classify(Arc::new(Both), "Both").unwrap();
        assert_eq!(unit.kind(), UnitKind::Wrapper);
    }

    #[test]
    fn test_noop_is_a_handler_candidate() {
        let (unit, descriptor) = classify(Arc::new(NoOp), "NoOp").unwrap();
        assert_eq!(unit.kind(), UnitKind::Handler);
        assert_eq!(descriptor.description(), Some("noop"));
    }

    #[test]
    fn test_layer_terminal_drops_next() {
        let unit = Unit::handler(Everything);
        let next: SharedHandler = Arc::new(handler_fn(|w, _req| {
            w.write(b"never");
            Ok(())
        }));

        let mut buffer = ResponseBuffer::new();
        unit.layer(next)
            .serve(&mut buffer, &mut empty_request("/"))
            .unwrap();
        assert_eq!(buffer.body_str(), "handler");
    }

    #[test]
    fn test_layer_context_unit_without_store() {
        let unit = Unit::context_middleware(Everything);
        let mut buffer = ResponseBuffer::new();
        let err = unit
            .layer(Arc::new(NoOp))
            .serve(&mut buffer, &mut empty_request("/"))
            .unwrap_err();

        match err {
            StackError::ContextMissing { unit } => assert!(unit.ends_with("Everything")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_descriptor_display() {
        let (_, descriptor) = classify(shapes(false, true, false, false), "app::Shapes").unwrap();
        assert_eq!(descriptor.to_string(), "middleware app::Shapes = shapes");
    }

    #[test]
    fn test_kind_needs_context() {
        assert!(UnitKind::ContextHandler.needs_context());
        assert!(!UnitKind::Wrapper.needs_context());
    }
}
