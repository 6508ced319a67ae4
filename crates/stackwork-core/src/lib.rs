//! # Stackwork Core
//!
//! Core types shared by every stackwork crate.
//!
//! - [`ResponseWriter`] - The per-request writer units write to, and the
//!   carrier of the context store
//! - [`ResponseBuffer`] - In-memory writer used by hosts and tests
//! - [`Handler`] - The basic executable unit
//! - [`Context`] - Per-request type-keyed store, with [`Transaction`]s
//! - [`StackError`] - Standard error type
//! - [`ChainConfig`] - Chain construction settings

#![doc(html_root_url = "https://docs.rs/stackwork-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod context;
mod error;
mod handler;
mod types;
mod writer;

pub use config::ChainConfig;
pub use context::{Context, Origin, Transaction};
pub use error::{StackError, StackResult};
pub use handler::{handler_fn, Handler, NoOp, SharedHandler};
pub use types::{body_bytes, empty_request, Request, Response, ResponseExt};
pub use writer::{flush, AsResponseWriter, ResponseBuffer, ResponseWriter};
