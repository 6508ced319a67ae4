//! The response writer every unit writes to.
//!
//! [`ResponseWriter`] is the per-request object that travels down the chain.
//! Besides status, headers and body it answers two questions:
//!
//! - [`ResponseWriter::context`]: does this writer carry a context store?
//! - [`ResponseWriter::reclaim`]: what is the original writer underneath any
//!   decorators?
//!
//! Decorating writers forward both so that a store attached at the outermost
//! edge of a chain stays visible to every unit.

use bytes::BytesMut;
use http::{HeaderMap, StatusCode};
use http_body_util::Full;

use crate::context::Context;
use crate::types::Response;

/// Access to a writer as a trait object.
///
/// Implemented for every sized [`ResponseWriter`]; it only exists so that
/// [`ResponseWriter::reclaim`] can have a default body.
pub trait AsResponseWriter {
    /// Returns `self` as a writer trait object.
    fn as_writer_mut(&mut self) -> &mut dyn ResponseWriter;
}

impl<W: ResponseWriter> AsResponseWriter for W {
    fn as_writer_mut(&mut self) -> &mut dyn ResponseWriter {
        self
    }
}

/// The writer a unit uses to produce the response.
pub trait ResponseWriter: AsResponseWriter {
    /// Returns the status set so far, `None` if no unit set one.
    fn status(&self) -> Option<StatusCode>;

    /// Sets the response status.
    fn set_status(&mut self, status: StatusCode);

    /// Returns the response headers.
    fn headers(&self) -> &HeaderMap;

    /// Returns the response headers for modification.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Appends `data` to the response body.
    fn write(&mut self, data: &[u8]);

    /// Returns the number of body bytes written so far.
    fn bytes_written(&self) -> usize;

    /// Flushes buffered output. Returns `false` if the writer cannot flush.
    fn flush(&mut self) -> bool {
        false
    }

    /// Returns the context store this writer carries, if any.
    fn context(&self) -> Option<Context> {
        None
    }

    /// Returns the original writer underneath any decorators.
    fn reclaim(&mut self) -> &mut dyn ResponseWriter {
        self.as_writer_mut()
    }

    /// Returns the concrete type name of this writer.
    fn kind(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns `true` once a status was set or body bytes were written.
    fn is_touched(&self) -> bool {
        self.status().is_some() || self.bytes_written() > 0
    }
}

/// Flushes the original writer underneath `writer`.
///
/// Returns `false` if the original writer cannot flush.
pub fn flush(writer: &mut dyn ResponseWriter) -> bool {
    writer.reclaim().flush()
}

/// An in-memory response writer.
///
/// Used by hosts to collect a chain's output before building the final
/// response, and by tests as a recorder.
///
/// # Example
///
/// ```
/// use stackwork_core::{ResponseBuffer, ResponseWriter};
/// use http::StatusCode;
///
/// let mut buffer = ResponseBuffer::new();
/// buffer.set_status(StatusCode::CREATED);
/// buffer.write(b"made");
///
/// assert_eq!(buffer.body_str(), "made");
/// let response = buffer.into_response();
/// assert_eq!(response.status(), StatusCode::CREATED);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResponseBuffer {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
    flushes: usize,
}

impl ResponseBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: None,
            headers: HeaderMap::with_capacity(8),
            body: BytesMut::with_capacity(512),
            flushes: 0,
        }
    }

    /// Returns the body written so far.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns how many times the buffer was flushed.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Converts the buffer into an HTTP response.
    ///
    /// An unset status becomes `200 OK`.
    #[must_use]
    pub fn into_response(self) -> Response {
        let mut response = http::Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseWriter for ResponseBuffer {
    fn status(&self) -> Option<StatusCode> {
        self.status
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
    }

    fn bytes_written(&self) -> usize {
        self.body.len()
    }

    fn flush(&mut self) -> bool {
        self.flushes += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_collects_body() {
        let mut buffer = ResponseBuffer::new();
        buffer.write(b"hello ");
        buffer.write(b"world");
        assert_eq!(buffer.body_str(), "hello world");
        assert_eq!(buffer.bytes_written(), 11);
    }

    #[test]
    fn test_untouched_buffer() {
        let buffer = ResponseBuffer::new();
        assert!(!buffer.is_touched());
        assert!(buffer.status().is_none());
        assert!(buffer.context().is_none());
    }

    #[test]
    fn test_status_touches() {
        let mut buffer = ResponseBuffer::new();
        buffer.set_status(StatusCode::NO_CONTENT);
        assert!(buffer.is_touched());
    }

    #[test]
    fn test_into_response_defaults_to_ok() {
        let mut buffer = ResponseBuffer::new();
        buffer
            .headers_mut()
            .insert("x-unit", http::HeaderValue::from_static("a"));
        let response = buffer.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("x-unit").unwrap(), "a");
    }

    #[test]
    fn test_reclaim_is_self() {
        let mut buffer = ResponseBuffer::new();
        let writer: &mut dyn ResponseWriter = &mut buffer;
        writer.reclaim().write(b"x");
        assert_eq!(buffer.body_str(), "x");
    }

    #[test]
    fn test_flush_helper() {
        let mut buffer = ResponseBuffer::new();
        assert!(flush(&mut buffer));
        assert_eq!(buffer.flush_count(), 1);
    }

    #[test]
    fn test_kind_names_concrete_type() {
        let buffer = ResponseBuffer::new();
        let writer: &dyn ResponseWriter = &buffer;
        assert!(writer.kind().ends_with("ResponseBuffer"));
    }
}
