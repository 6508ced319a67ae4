//! Unit traits.
//!
//! Besides the terminal [`Handler`] from `stackwork-core`, a chain accepts four
//! more shapes of request-handling unit:
//!
//! | Trait | Receives | Continues by |
//! |---|---|---|
//! | [`Wrapper`] | the next handler, once, at build time | returning a handler that calls it |
//! | [`Middleware`] | writer, request, next | calling `next.serve` |
//! | [`ContextHandler`] | context, writer, request | never (terminal) |
//! | [`ContextMiddleware`] | context, writer, request, next | calling `next.serve` |
//!
//! Every trait is implemented for closures of the matching signature. When a
//! closure is stored before it is registered, the `*_fn` helpers pin its
//! argument types.
//!
//! # Example
//!
//! ```
//! use stackwork_middleware::{middleware_fn, Middleware};
//! use stackwork_core::{empty_request, handler_fn, ResponseBuffer, ResponseWriter};
//!
//! let tag = middleware_fn(|w, req, next| {
//!     w.write(b"[");
//!     next.serve(w, req)?;
//!     w.write(b"]");
//!     Ok(())
//! });
//!
//! let inner = handler_fn(|w, _req| {
//!     w.write(b"app");
//!     Ok(())
//! });
//!
//! let mut buffer = ResponseBuffer::new();
//! tag.serve(&mut buffer, &mut empty_request("/"), &inner).unwrap();
//! assert_eq!(buffer.body_str(), "[app]");
//! ```

use stackwork_core::{Context, Handler, Request, ResponseWriter, SharedHandler, StackResult};

/// Transforms the next handler into a new handler.
///
/// `wrap` runs once per chain build, never per request.
pub trait Wrapper: Send + Sync + 'static {
    /// Returns a handler that eventually delegates to `next`, or does not.
    fn wrap(&self, next: SharedHandler) -> SharedHandler;

    /// Short human-readable description, used in chain debug listings.
    fn describe(&self) -> Option<String> {
        None
    }

    /// Returns `true` if the handlers this wrapper produces attach a context
    /// store.
    fn injects_context(&self) -> bool {
        false
    }
}

impl<F> Wrapper for F
where
    F: Fn(SharedHandler) -> SharedHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: SharedHandler) -> SharedHandler {
        self(next)
    }
}

/// A unit that receives the next handler explicitly and decides whether and
/// when to call it.
pub trait Middleware: Send + Sync + 'static {
    /// Handles one request.
    ///
    /// # Errors
    ///
    /// Returns the unit's own failure or whatever `next` reported.
    fn serve(
        &self,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
        next: &dyn Handler,
    ) -> StackResult<()>;

    /// Short human-readable description, used in chain debug listings.
    fn describe(&self) -> Option<String> {
        None
    }

    /// Returns `true` if this middleware attaches a context store itself.
    fn injects_context(&self) -> bool {
        false
    }
}

impl<F> Middleware for F
where
    F: Fn(&mut dyn ResponseWriter, &mut Request, &dyn Handler) -> StackResult<()>
        + Send
        + Sync
        + 'static,
{
    fn serve(
        &self,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
        next: &dyn Handler,
    ) -> StackResult<()> {
        self(writer, request, next)
    }
}

/// A terminal handler that also receives the request's context store.
pub trait ContextHandler: Send + Sync + 'static {
    /// Handles one request.
    ///
    /// # Errors
    ///
    /// Returns whatever the handler reports.
    fn serve(
        &self,
        ctx: &Context,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
    ) -> StackResult<()>;

    /// Short human-readable description, used in chain debug listings.
    fn describe(&self) -> Option<String> {
        None
    }

    /// Type name used when the unit runs without a store.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<F> ContextHandler for F
where
    F: Fn(&Context, &mut dyn ResponseWriter, &mut Request) -> StackResult<()>
        + Send
        + Sync
        + 'static,
{
    fn serve(
        &self,
        ctx: &Context,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
    ) -> StackResult<()> {
        self(ctx, writer, request)
    }
}

/// A [`Middleware`] that also receives the request's context store.
pub trait ContextMiddleware: Send + Sync + 'static {
    /// Handles one request.
    ///
    /// # Errors
    ///
    /// Returns the unit's own failure or whatever `next` reported.
    fn serve(
        &self,
        ctx: &Context,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
        next: &dyn Handler,
    ) -> StackResult<()>;

    /// Short human-readable description, used in chain debug listings.
    fn describe(&self) -> Option<String> {
        None
    }

    /// Type name used when the unit runs without a store.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<F> ContextMiddleware for F
where
    F: Fn(&Context, &mut dyn ResponseWriter, &mut Request, &dyn Handler) -> StackResult<()>
        + Send
        + Sync
        + 'static,
{
    fn serve(
        &self,
        ctx: &Context,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
        next: &dyn Handler,
    ) -> StackResult<()> {
        self(ctx, writer, request, next)
    }
}

/// Pins a closure to the [`Wrapper`] signature.
pub fn wrapper_fn<F>(f: F) -> F
where
    F: Fn(SharedHandler) -> SharedHandler + Send + Sync + 'static,
{
    f
}

/// Pins a closure to the [`Middleware`] signature.
pub fn middleware_fn<F>(f: F) -> F
where
    F: Fn(&mut dyn ResponseWriter, &mut Request, &dyn Handler) -> StackResult<()>
        + Send
        + Sync
        + 'static,
{
    f
}

/// Pins a closure to the [`ContextHandler`] signature.
pub fn context_handler_fn<F>(f: F) -> F
where
    F: Fn(&Context, &mut dyn ResponseWriter, &mut Request) -> StackResult<()>
        + Send
        + Sync
        + 'static,
{
    f
}

/// Pins a closure to the [`ContextMiddleware`] signature.
pub fn context_middleware_fn<F>(f: F) -> F
where
    F: Fn(&Context, &mut dyn ResponseWriter, &mut Request, &dyn Handler) -> StackResult<()>
        + Send
        + Sync
        + 'static,
{
    f
}
