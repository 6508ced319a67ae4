//! # Stackwork Server
//!
//! Hyper host adapter for stackwork chains.
//!
//! A compiled [`Chain`](stackwork_middleware::Chain) is synchronous and
//! writes into a [`ResponseBuffer`](stackwork_core::ResponseBuffer). This
//! crate puts it behind a TCP listener:
//!
//! - [`ChainService`] - `hyper::service::Service` that buffers the body,
//!   runs the chain on the blocking pool and converts the buffer into a
//!   response
//! - [`Server`] - accept loop configured by
//!   [`ServerConfig`](stackwork_config::ServerConfig), with graceful shutdown
//! - [`serve`] - shortest path from a listener and a chain to a running server
//!
//! ```rust,ignore
//! use stackwork_middleware::Chain;
//! use tokio::net::TcpListener;
//!
//! let chain = Chain::builder().wrap_fn(|w, _req| {
//!     w.write(b"hello");
//!     Ok(())
//! })?;
//!
//! let listener = TcpListener::bind("127.0.0.1:8080").await?;
//! stackwork_server::serve(listener, chain).await?;
//! ```

#![doc(html_root_url = "https://docs.rs/stackwork-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod server;
pub mod service;
pub mod shutdown;

pub use error::{ServerError, ServerResult};
pub use server::{serve, Server};
pub use service::{response_bytes, ChainService, DEFAULT_MAX_BODY_BYTES};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
