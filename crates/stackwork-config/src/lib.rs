//! Typed configuration for stackwork.
//!
//! This crate provides a strongly-typed configuration system with support for:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → files → env)
//!
//! # Overview
//!
//! [`StackworkConfig`] holds every section:
//!
//! - [`ChainConfig`] - How chains are built (debug capture, build logging)
//! - [`LoggingConfig`] - Log level, format and service name
//! - [`ServerConfig`] - Host adapter settings (address, body limit, shutdown)
//!
//! # Example
//!
//! ```no_run
//! use stackwork_config::ConfigLoader;
//!
//! # fn main() -> Result<(), stackwork_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("stackwork.toml")?
//!     .with_env_prefix("STACKWORK")
//!     .load()?;
//!
//! println!("Listening on: {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [chain]
//! capture_debug = true
//! log_build = true
//!
//! [logging]
//! level = "info"
//! format = "json"
//! service_name = "my-service"
//!
//! [server]
//! http_addr = "0.0.0.0:8080"
//! max_body_bytes = 1048576
//! keep_alive = true
//! shutdown_timeout_secs = 30
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden via environment variables using the format
//! `PREFIX__SECTION__KEY`. For example:
//!
//! - `STACKWORK__SERVER__HTTP_ADDR=0.0.0.0:9000`
//! - `STACKWORK__LOGGING__LEVEL=debug`
//! - `STACKWORK__CHAIN__CAPTURE_DEBUG=false`

#![doc(html_root_url = "https://docs.rs/stackwork-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{StackworkConfig, StackworkConfigBuilder};
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{LogFormat, LoggingConfig, ServerConfig};
pub use stackwork_core::ChainConfig;
