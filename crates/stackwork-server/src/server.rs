//! TCP accept loop for serving a chain over HTTP/1.1.
//!
//! One Tokio task per connection, each driving a hyper `http1` connection
//! around a clone of the [`ChainService`]. On shutdown the loop stops
//! accepting, open connections are asked to finish their current request,
//! and the server waits for them up to `shutdown_timeout_secs`.
//!
//! # Example
//!
//! ```rust,ignore
//! use stackwork_config::ServerConfig;
//! use stackwork_middleware::Chain;
//! use stackwork_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let chain = Chain::builder().wrap_fn(|w, _req| {
//!         w.write(b"hello");
//!         Ok(())
//!     })?;
//!
//!     Server::new(ServerConfig::default(), chain).run().await?;
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use stackwork_config::ServerConfig;
use stackwork_core::Handler;
use tokio::net::{TcpListener, TcpStream};

use crate::error::{ServerError, ServerResult};
use crate::service::ChainService;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Serves `handler` on an already bound listener with default settings
/// until the process ends.
///
/// # Errors
///
/// Returns [`ServerError::Io`] if the listener address cannot be read.
pub async fn serve<H: Handler>(listener: TcpListener, handler: H) -> ServerResult<()> {
    Server::new(ServerConfig::default(), handler)
        .run_on(listener, ShutdownSignal::new())
        .await
}

/// HTTP host for a chain.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    service: ChainService,
}

impl Server {
    /// Creates a server for `handler` using `config`.
    #[must_use]
    pub fn new<H: Handler>(config: ServerConfig, handler: H) -> Self {
        let service = ChainService::new(handler).with_max_body_bytes(config.max_body_bytes);
        Self { config, service }
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the per-request service.
    #[must_use]
    pub const fn service(&self) -> &ChainService {
        &self.service
    }

    /// Binds the configured address and serves until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// See [`run_with_shutdown`](Self::run_with_shutdown).
    pub async fn run(self) -> ServerResult<()> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and serves until `shutdown` triggers.
    ///
    /// # Errors
    ///
    /// - [`ServerError::InvalidAddress`] if `http_addr` does not parse
    /// - [`ServerError::Bind`] if the address cannot be bound
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> ServerResult<()> {
        let addr: SocketAddr = self
            .config
            .http_addr
            .parse()
            .map_err(|e| ServerError::invalid_address(&self.config.http_addr, e))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        self.run_on(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` triggers.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the listener address cannot be read.
    pub async fn run_on(self, listener: TcpListener, shutdown: ShutdownSignal) -> ServerResult<()> {
        let local = listener.local_addr()?;
        tracing::info!(http.addr = %local, "server listening");

        let tracker = ConnectionTracker::new();
        let keep_alive = self.config.keep_alive;

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let token = tracker.acquire();
                        let service = self.service.clone();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(stream, service, keep_alive, shutdown).await {
                                tracing::debug!(remote = %remote, error = %e, "connection error");
                            }
                            drop(token);
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to accept connection");
                    }
                },
                () = shutdown.recv() => {
                    tracing::info!("shutdown requested, no longer accepting connections");
                    break;
                }
            }
        }

        let timeout = Duration::from_secs(self.config.shutdown_timeout_secs);
        tracing::info!(
            active = tracker.active_connections(),
            timeout_secs = self.config.shutdown_timeout_secs,
            "waiting for connections to close"
        );

        if tokio::time::timeout(timeout, tracker.wait_idle()).await.is_err() {
            tracing::warn!(
                active = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            );
        }

        tracing::info!("server stopped");
        Ok(())
    }
}

async fn serve_connection(
    stream: TcpStream,
    service: ChainService,
    keep_alive: bool,
    shutdown: ShutdownSignal,
) -> Result<(), hyper::Error> {
    let conn = http1::Builder::new()
        .keep_alive(keep_alive)
        .serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.recv() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    }
}
