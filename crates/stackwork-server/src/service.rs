//! Hyper service that runs a chain per request.
//!
//! The chain is synchronous and works on a buffered request, so the service
//! collects the whole body first (bounded by `max_body_bytes`), then serves
//! the chain into a [`ResponseBuffer`] on Tokio's blocking pool and turns the
//! buffer into the response. A unit that blocks holds up its own request
//! only.
//!
//! | Outcome                 | Response                         |
//! |-------------------------|----------------------------------|
//! | chain returns `Ok`      | whatever the chain wrote         |
//! | chain returns `Err`     | `500`, error logged              |
//! | chain panics            | `500`, panic logged              |
//! | body over the limit     | `413`, chain not run             |
//! | body cannot be read     | `400`, chain not run             |
//!
//! Put a `Catch` unit in the chain to turn panics into a response of its
//! own.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::service::Service;
use stackwork_core::{Handler, Request, Response, ResponseBuffer, ResponseExt, SharedHandler};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Default request body limit: 1 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Serves a handler (usually a compiled [`Chain`](stackwork_middleware::Chain))
/// as a hyper service.
///
/// Cloning is cheap; every connection gets its own clone.
///
/// # Example
///
/// ```
/// use stackwork_middleware::Chain;
/// use stackwork_server::ChainService;
///
/// let chain = Chain::builder()
///     .wrap_fn(|w, _req| {
///         w.write(b"ok");
///         Ok(())
///     })
///     .unwrap();
///
/// let service = ChainService::new(chain).with_max_body_bytes(64 * 1024);
/// assert_eq!(service.max_body_bytes(), 64 * 1024);
/// ```
#[derive(Clone)]
pub struct ChainService {
    handler: SharedHandler,
    max_body_bytes: usize,
}

impl ChainService {
    /// Creates a service for `handler` with the default body limit.
    #[must_use]
    pub fn new<H: Handler>(handler: H) -> Self {
        Self::shared(Arc::new(handler))
    }

    /// Creates a service for an already shared handler.
    #[must_use]
    pub fn shared(handler: SharedHandler) -> Self {
        Self {
            handler,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Sets the request body limit.
    #[must_use]
    pub const fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Returns the request body limit.
    #[must_use]
    pub const fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Collects the body of `request` and runs the handler on it.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn handle<B>(&self, request: http::Request<B>) -> Response
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = request.into_parts();

        let bytes = match Limited::new(body, self.max_body_bytes).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                tracing::debug!(
                    http.method = %parts.method,
                    http.path = parts.uri.path(),
                    limit = self.max_body_bytes,
                    "request body too large"
                );
                return Response::error(StatusCode::PAYLOAD_TOO_LARGE, "request body too large");
            }
            Err(err) => {
                tracing::debug!(error = %err, "failed to read request body");
                return Response::error(StatusCode::BAD_REQUEST, "failed to read request body");
            }
        };

        let mut request = Request::from_parts(parts, Full::new(bytes));
        let service = self.clone();
        match tokio::task::spawn_blocking(move || service.dispatch(&mut request)).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(error = %err, "chain panicked");
                Response::error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }

    /// Runs the handler on an already buffered request, on the calling
    /// thread.
    pub fn dispatch(&self, request: &mut Request) -> Response {
        let started = Instant::now();
        let mut buffer = ResponseBuffer::new();

        match self.handler.serve(&mut buffer, request) {
            Ok(()) => {
                let response = buffer.into_response();
                tracing::debug!(
                    http.method = %request.method(),
                    http.path = request.uri().path(),
                    http.status_code = response.status().as_u16(),
                    duration_ms = elapsed_ms(started),
                    "request served"
                );
                response
            }
            Err(err) => {
                tracing::error!(
                    http.method = %request.method(),
                    http.path = request.uri().path(),
                    duration_ms = elapsed_ms(started),
                    error = %err,
                    "chain failed"
                );
                Response::error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

impl std::fmt::Debug for ChainService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainService")
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

impl<B> Service<http::Request<B>> for ChainService
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn call(&self, request: http::Request<B>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(request).await) })
    }
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Reads a response body into bytes.
///
/// # Errors
///
/// Never fails; `Full` bodies are infallible.
pub async fn response_bytes(response: Response) -> Result<Bytes, Infallible> {
    Ok(response.into_body().collect().await?.to_bytes())
}
