//! # Stackwork
//!
//! **Middleware chain compiler with a per-request typed context store**
//!
//! - Register units of any of five shapes (wrapper, terminal handler,
//!   middleware, and the two context-aware variants) and compile them once
//!   into a single handler
//! - Give every request a fresh type-keyed store that any unit can reach
//!   through the response writer
//! - Serve the compiled chain over HTTP/1.1 with hyper
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stackwork::prelude::*;
//!
//! #[derive(Clone)]
//! struct User(String);
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().with_development().load()?;
//!     init_logging(&LogConfig::from(&config.logging))?;
//!
//!     let chain = Chain::builder_with(config.chain)
//!         .context_before_fn(|ctx, _w, _req| {
//!             ctx.set(User("ada".into()));
//!             Ok(())
//!         })
//!         .wrap_fn_with_context(|ctx, w, _req| {
//!             let user = ctx.get::<User>().map(|u| u.0).unwrap_or_default();
//!             w.write(format!("hello {user}").as_bytes());
//!             Ok(())
//!         })?;
//!
//!     Server::new(config.server, chain).run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Layout
//!
//! ```text
//! request → [Injected] → unit 0 → unit 1 → … → terminal
//!              │
//!              └─ fresh Context, reachable via writer.context()
//! ```

#![doc(html_root_url = "https://docs.rs/stackwork/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use stackwork_config as config;
pub use stackwork_core as core;
pub use stackwork_middleware as middleware;
pub use stackwork_server as server;
pub use stackwork_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use stackwork::prelude::*;
/// ```
pub mod prelude {
    pub use stackwork_core::{
        body_bytes, handler_fn, ChainConfig, Context, Handler, Origin, Request, Response,
        ResponseBuffer, ResponseWriter, StackError, StackResult, Transaction,
    };

    pub use stackwork_middleware::stages::{
        After, Around, Before, Catch, ContextBefore, Defer, First, Guard, Stop, Trace,
    };
    pub use stackwork_middleware::{
        compile, context_of, naive, require_context, Candidate, Chain, ChainBuilder,
        ContextHandler, ContextMiddleware, Entry, Middleware, Unit, Wrapper,
    };

    pub use stackwork_config::{ConfigLoader, StackworkConfig};
    pub use stackwork_server::{ChainService, Server, ShutdownSignal};
    pub use stackwork_telemetry::{init_logging, LogConfig};
}
