//! # Stackwork Middleware
//!
//! Compiles ordered lists of request-handling units into a single handler,
//! and shares a per-request [`Context`](stackwork_core::Context) store
//! between them.
//!
//! ## Units
//!
//! | Shape | Trait | Continues |
//! |-------|-------|-----------|
//! | wrapper | [`Wrapper`] | however it wraps `next` |
//! | handler | [`Handler`](stackwork_core::Handler) | never |
//! | middleware | [`Middleware`] | by calling `next` |
//! | context handler | [`ContextHandler`] | never |
//! | context middleware | [`ContextMiddleware`] | by calling `next` |
//!
//! ## Composition
//!
//! ```text
//! Chain::builder().a().b().c().wrap(app)
//!
//! Request → a → b → c → app
//! ```
//!
//! The first registered unit is the outermost. A terminal handler ends the
//! chain; units registered after it never run.
//!
//! ## Context
//!
//! Context units need a store attached to the writer. The outermost chain
//! attaches it, either with [`ChainBuilder::build_with_context`] and
//! friends or by registering the [`context`] wrapper. Attaching twice is a
//! build error.
//!
//! ## Example
//!
//! ```
//! use stackwork_core::{empty_request, Handler, ResponseBuffer, ResponseWriter};
//! use stackwork_middleware::Chain;
//!
//! #[derive(Clone)]
//! struct User(String);
//!
//! let chain = Chain::builder()
//!     .context_before_fn(|ctx, _w, req| {
//!         let name = req.uri().path().trim_start_matches('/').to_string();
//!         ctx.set(User(name));
//!         Ok(())
//!     })
//!     .wrap_fn_with_context(|ctx, w, _req| {
//!         let user = ctx.get::<User>().map_or_else(String::new, |u| u.0);
//!         w.write(format!("hello {user}").as_bytes());
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let mut buffer = ResponseBuffer::new();
//! chain.serve(&mut buffer, &mut empty_request("/ada")).unwrap();
//! assert_eq!(buffer.body_str(), "hello ada");
//! ```

#![doc(html_root_url = "https://docs.rs/stackwork-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod bridge;
pub mod chain;
pub mod inject;
pub mod middleware;
pub mod stages;
pub mod unit;

pub use bridge::{
    context_of, naive, naive_middleware, require_context, require_context_middleware, Naive,
    RequireContext,
};
pub use chain::{compile, Chain, ChainBuilder, Entry};
pub use inject::{context, try_wrap, ContextInjector, ContextWriter, Injected};
pub use middleware::{
    context_handler_fn, context_middleware_fn, middleware_fn, wrapper_fn, ContextHandler,
    ContextMiddleware, Middleware, Wrapper,
};
pub use unit::{classify, Candidate, Descriptor, Unit, UnitKind};
