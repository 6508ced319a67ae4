//! Try handlers in turn until one responds.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use stackwork_core::{Handler, Request, ResponseWriter, SharedHandler, StackResult};

use super::Peek;
use crate::middleware::Middleware;
use crate::unit::Candidate;

/// Runs its handlers in order. The first one that writes to the response ends
/// the chain; if none does, the chain continues with `next`.
///
/// # Example
///
/// ```
/// use stackwork_core::handler_fn;
/// use stackwork_middleware::stages::First;
///
/// let lookup = First::new()
///     .or(handler_fn(|w, req| {
///         if req.uri().path() == "/cached" {
///             w.write(b"from cache");
///         }
///         Ok(())
///     }))
///     .or(handler_fn(|_w, _req| Ok(())));
///
/// assert_eq!(lookup.len(), 2);
/// ```
#[derive(Clone)]
pub struct First {
    handlers: Vec<SharedHandler>,
    caller: &'static Location<'static>,
}

impl First {
    /// Creates the unit with no handlers; it continues on every request
    /// until handlers are added.
    #[track_caller]
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            caller: Location::caller(),
        }
    }

    /// Creates the unit from already shared handlers.
    #[track_caller]
    pub fn from_handlers<I>(handlers: I) -> Self
    where
        I: IntoIterator<Item = SharedHandler>,
    {
        Self {
            handlers: handlers.into_iter().collect(),
            caller: Location::caller(),
        }
    }

    /// Appends a handler to try.
    #[must_use]
    pub fn or<H: Handler>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Number of handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if there are no handlers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for First {
    #[track_caller]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for First {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<First {} handlers {}>", self.handlers.len(), self.caller)
    }
}

impl Middleware for First {
    fn serve(
        &self,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
        next: &dyn Handler,
    ) -> StackResult<()> {
        for handler in &self.handlers {
            let mut peek = Peek::new(writer);
            handler.serve(&mut peek, request)?;
            if peek.changed() {
                return Ok(());
            }
        }
        next.serve(writer, request)
    }

    fn describe(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl Candidate for First {
    fn as_middleware(self: Arc<Self>) -> Option<Arc<dyn Middleware>> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use stackwork_core::{empty_request, handler_fn, ResponseBuffer};

    fn fallback() -> impl Handler {
        handler_fn(|w, _req| {
            w.write(b"fallback");
            Ok(())
        })
    }

    #[test]
    fn test_first_responder_wins() {
        let later_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&later_calls);

        let unit = First::new()
            .or(handler_fn(|_w, _req| Ok(())))
            .or(handler_fn(|w, _req| {
                w.write(b"second");
                Ok(())
            }))
            .or(handler_fn(move |_w, _req| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));

        let mut buffer = ResponseBuffer::new();
        unit.serve(&mut buffer, &mut empty_request("/"), &fallback())
            .unwrap();
        assert_eq!(buffer.body_str(), "second");
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_header_overwrite_counts_as_response() {
        let unit = First::new().or(handler_fn(|w, _req| {
            w.headers_mut()
                .insert("cache-control", http::HeaderValue::from_static("no-store"));
            Ok(())
        }));

        let mut buffer = ResponseBuffer::new();
        buffer
            .headers_mut()
            .insert("cache-control", http::HeaderValue::from_static("max-age=60"));
        unit.serve(&mut buffer, &mut empty_request("/"), &fallback())
            .unwrap();

        assert_eq!(buffer.headers().get("cache-control").unwrap(), "no-store");
        assert_eq!(buffer.body_str(), "");
    }

    #[test]
    fn test_nobody_responds_continues() {
        let unit = First::from_handlers([Arc::new(stackwork_core::NoOp) as SharedHandler]);

        let mut buffer = ResponseBuffer::new();
        unit.serve(&mut buffer, &mut empty_request("/"), &fallback())
            .unwrap();
        assert_eq!(buffer.body_str(), "fallback");
    }

    #[test]
    fn test_empty_continues() {
        let unit = First::default();
        assert!(unit.is_empty());

        let mut buffer = ResponseBuffer::new();
        unit.serve(&mut buffer, &mut empty_request("/"), &fallback())
            .unwrap();
        assert_eq!(buffer.body_str(), "fallback");
    }
}
