//! The terminal request handler.
//!
//! A [`Handler`] is the basic executable unit: given a response writer and a
//! request it does its work and returns. Every compiled chain is itself a
//! handler, so chains nest.
//!
//! Handlers run synchronously on the caller's thread. A host that wants to
//! run chains off its reactor does so around [`Handler::serve`].

use std::sync::Arc;

use crate::error::StackResult;
use crate::types::Request;
use crate::writer::ResponseWriter;

/// A request handler.
///
/// Implemented for every `Fn(&mut dyn ResponseWriter, &mut Request) -> StackResult<()>`
/// closure. Closures whose argument types cannot be inferred at the call site
/// can be pinned with [`handler_fn`].
///
/// # Example
///
/// ```
/// use stackwork_core::{handler_fn, empty_request, Handler, ResponseBuffer, ResponseWriter};
///
/// let hello = handler_fn(|w, _req| {
///     w.write(b"hello");
///     Ok(())
/// });
///
/// let mut buffer = ResponseBuffer::new();
/// hello.serve(&mut buffer, &mut empty_request("/")).unwrap();
/// assert_eq!(buffer.body_str(), "hello");
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Handles one request.
    ///
    /// # Errors
    ///
    /// Returns whatever error the handler or any unit it delegates to reports.
    fn serve(&self, writer: &mut dyn ResponseWriter, request: &mut Request) -> StackResult<()>;

    /// Short human-readable description, used in chain debug listings.
    fn describe(&self) -> Option<String> {
        None
    }

    /// Returns `true` if this handler attaches a context store to the writer
    /// before delegating.
    ///
    /// Compiled chains report `true` when their outermost unit is the context
    /// adapter, which lets the chain compiler refuse to inject twice.
    fn injects_context(&self) -> bool {
        false
    }
}

impl<F> Handler for F
where
    F: Fn(&mut dyn ResponseWriter, &mut Request) -> StackResult<()> + Send + Sync + 'static,
{
    fn serve(&self, writer: &mut dyn ResponseWriter, request: &mut Request) -> StackResult<()> {
        self(writer, request)
    }
}

/// Pins a closure to the handler signature.
///
/// This is the identity function; it exists so that `|w, r| ...` gets its
/// argument types from the bound instead of from inference.
pub fn handler_fn<F>(f: F) -> F
where
    F: Fn(&mut dyn ResponseWriter, &mut Request) -> StackResult<()> + Send + Sync + 'static,
{
    f
}

/// Shared, type-erased handler.
pub type SharedHandler = Arc<dyn Handler>;

/// A handler that does nothing.
///
/// Used as the innermost handler of a chain that has no terminal of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOp;

impl Handler for NoOp {
    fn serve(&self, _writer: &mut dyn ResponseWriter, _request: &mut Request) -> StackResult<()> {
        Ok(())
    }

    fn describe(&self) -> Option<String> {
        Some("noop".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackError;
    use crate::types::empty_request;
    use crate::writer::ResponseBuffer;

    #[test]
    fn test_closure_is_handler() {
        let h = handler_fn(|w, req| {
            w.write(req.uri().path().as_bytes());
            Ok(())
        });

        let mut buffer = ResponseBuffer::new();
        h.serve(&mut buffer, &mut empty_request("/ping")).unwrap();
        assert_eq!(buffer.body_str(), "/ping");
        assert!(!h.injects_context());
        assert!(h.describe().is_none());
    }

    #[test]
    fn test_error_propagates() {
        let h = handler_fn(|_w, _req| Err(StackError::unit_msg("nope")));
        let mut buffer = ResponseBuffer::new();
        let err = h.serve(&mut buffer, &mut empty_request("/")).unwrap_err();
        assert!(matches!(err, StackError::Unit(_)));
    }

    #[test]
    fn test_noop_leaves_writer_untouched() {
        let mut buffer = ResponseBuffer::new();
        NoOp.serve(&mut buffer, &mut empty_request("/")).unwrap();
        assert!(!buffer.is_touched());
    }

    #[test]
    fn test_shared_handler_dispatch() {
        let shared: SharedHandler = Arc::new(handler_fn(|w, _req| {
            w.write(b"shared");
            Ok(())
        }));
        let mut buffer = ResponseBuffer::new();
        shared.serve(&mut buffer, &mut empty_request("/")).unwrap();
        assert_eq!(buffer.body_str(), "shared");
    }
}
