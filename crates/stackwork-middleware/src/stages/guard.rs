//! Let a handler short-circuit the chain by responding.

use std::any::type_name;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use stackwork_core::{Handler, Request, ResponseWriter, StackResult};

use super::Peek;
use crate::middleware::Middleware;
use crate::unit::Candidate;

/// Runs a handler; if it wrote to the response (status, headers or body) the
/// chain stops there, otherwise it continues with `next`.
///
/// Any mutable header access counts as a write, even one that stores the
/// value already present.
///
/// Typical use is an access check that only writes when it denies.
pub struct Guard<H> {
    handler: H,
    caller: &'static Location<'static>,
}

impl<H: Handler> Guard<H> {
    /// Creates the unit.
    #[track_caller]
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            caller: Location::caller(),
        }
    }
}

impl<H: Handler> fmt::Display for Guard<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Guard {} {}>", type_name::<H>(), self.caller)
    }
}

impl<H: Handler> Middleware for Guard<H> {
    fn serve(
        &self,
        writer: &mut dyn ResponseWriter,
        request: &mut Request,
        next: &dyn Handler,
    ) -> StackResult<()> {
        let mut peek = Peek::new(writer);
        self.handler.serve(&mut peek, request)?;
        if peek.changed() {
            return Ok(());
        }
        next.serve(writer, request)
    }

    fn describe(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<H: Handler> Candidate for Guard<H> {
    fn as_middleware(self: Arc<Self>) -> Option<Arc<dyn Middleware>> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use stackwork_core::{empty_request, handler_fn, ResponseBuffer};

    fn members_only() -> Guard<impl Handler> {
        Guard::new(handler_fn(|w, req| {
            if req.headers().contains_key("x-member") {
                return Ok(());
            }
            w.set_status(StatusCode::UNAUTHORIZED);
            Ok(())
        }))
    }

    fn app() -> impl Handler {
        handler_fn(|w, _req| {
            w.write(b"welcome");
            Ok(())
        })
    }

    #[test]
    fn test_untouched_continues() {
        let mut request = empty_request("/");
        request
            .headers_mut()
            .insert("x-member", http::HeaderValue::from_static("yes"));

        let mut buffer = ResponseBuffer::new();
        members_only()
            .serve(&mut buffer, &mut request, &app())
            .unwrap();
        assert_eq!(buffer.body_str(), "welcome");
    }

    #[test]
    fn test_header_overwrite_stops() {
        let deny = Guard::new(handler_fn(|w, _req| {
            w.headers_mut()
                .insert("x-access", http::HeaderValue::from_static("denied"));
            Ok(())
        }));

        let mut buffer = ResponseBuffer::new();
        buffer
            .headers_mut()
            .insert("x-access", http::HeaderValue::from_static("pending"));
        deny.serve(&mut buffer, &mut empty_request("/"), &app())
            .unwrap();

        assert_eq!(buffer.headers().get("x-access").unwrap(), "denied");
        assert_eq!(buffer.body_str(), "");
    }

    #[test]
    fn test_touched_stops() {
        let mut buffer = ResponseBuffer::new();
        members_only()
            .serve(&mut buffer, &mut empty_request("/"), &app())
            .unwrap();
        assert_eq!(buffer.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(buffer.body_str(), "");
    }
}
