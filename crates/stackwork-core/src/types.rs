//! Common types used throughout the chain.
//!
//! This module defines the HTTP request and response types that units see.

use bytes::Bytes;
use futures_util::FutureExt;
use http_body_util::{BodyExt, Full};

/// The HTTP request type handed to every unit.
///
/// This is a standard `http::Request` with a `Full<Bytes>` body.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type produced from a [`ResponseBuffer`](crate::ResponseBuffer).
///
/// This is a standard `http::Response` with a `Full<Bytes>` body.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building plain responses outside of a chain.
pub trait ResponseExt {
    /// Creates a plain-text error response with the given status code and message.
    fn error(status: http::StatusCode, message: &str) -> Response;
}

impl ResponseExt for Response {
    fn error(status: http::StatusCode, message: &str) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::from(message.to_string())));
        *response.status_mut() = status;
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

/// Builds an empty `GET` request for `uri`.
///
/// Falls back to `/` when `uri` does not parse.
#[must_use]
pub fn empty_request(uri: &str) -> Request {
    let mut request = http::Request::new(Full::new(Bytes::new()));
    if let Ok(parsed) = uri.parse() {
        *request.uri_mut() = parsed;
    }
    request
}

/// Returns a copy of the buffered request body.
///
/// Hosts hand units a fully collected body, so this never waits.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use http_body_util::Full;
/// use stackwork_core::body_bytes;
///
/// let request = http::Request::new(Full::new(Bytes::from_static(b"name=ada")));
/// assert_eq!(body_bytes(&request), "name=ada");
/// ```
#[must_use]
pub fn body_bytes(request: &Request) -> Bytes {
    match request.body().clone().collect().now_or_never() {
        Some(Ok(collected)) => collected.to_bytes(),
        Some(Err(never)) => match never {},
        // a `Full` body is always ready
        None => Bytes::new(),
    }
}
