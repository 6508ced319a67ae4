//! Main configuration types.
//!
//! This module provides the top-level [`StackworkConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{ChainConfig, ConfigError, ConfigResult, LogFormat, LoggingConfig, ServerConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Complete stackwork configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use stackwork_config::StackworkConfig;
///
/// let config = StackworkConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(config.chain.log_build);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct StackworkConfig {
    /// Chain construction settings.
    #[serde(default)]
    pub chain: ChainConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Host adapter configuration.
    #[serde(default)]
    pub server: ServerConfig,
}

impl StackworkConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> StackworkConfigBuilder {
        StackworkConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if:
    /// - Server address is not a socket address
    /// - Log level is not one of trace, debug, info, warn, error
    /// - Body limit is zero
    pub fn validate(&self) -> ConfigResult<()> {
        if self
            .server
            .http_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!("expected one of {}", LOG_LEVELS.join(", ")),
            ));
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// - Chain debug capture and build logging on
    /// - Pretty log formatting with ANSI colors and source locations
    /// - Debug log level
    ///
    /// # Example
    ///
    /// ```
    /// use stackwork_config::StackworkConfig;
    ///
    /// let config = StackworkConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// assert!(config.chain.capture_debug);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.chain = ChainConfig::debug();

        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config.logging.include_location = true;

        config.server.http_addr = "127.0.0.1:8080".to_string();

        config
    }

    /// Create a production configuration preset.
    ///
    /// - No chain debug capture
    /// - JSON log formatting at info level
    ///
    /// # Example
    ///
    /// ```
    /// use stackwork_config::{LogFormat, StackworkConfig};
    ///
    /// let config = StackworkConfig::production();
    /// assert_eq!(config.logging.format, LogFormat::Json);
    /// assert!(!config.chain.capture_debug);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.chain.capture_debug = false;
        config.chain.log_build = true;

        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi_enabled = false;

        config
    }
}

/// Builder for [`StackworkConfig`].
#[derive(Debug, Default)]
pub struct StackworkConfigBuilder {
    chain: Option<ChainConfig>,
    logging: Option<LoggingConfig>,
    server: Option<ServerConfig>,
}

impl StackworkConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chain settings.
    #[must_use]
    pub const fn chain(mut self, chain: ChainConfig) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Set the server configuration.
    #[must_use]
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.server = Some(server);
        self
    }

    /// Build the configuration.
    ///
    /// Any unset sections will use their default values.
    #[must_use]
    pub fn build(self) -> StackworkConfig {
        StackworkConfig {
            chain: self.chain.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
            server: self.server.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> ConfigResult<StackworkConfig> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sections() {
        let config = StackworkConfig::builder()
            .chain(ChainConfig::quiet())
            .server(ServerConfig {
                http_addr: "127.0.0.1:3000".to_string(),
                ..Default::default()
            })
            .build();

        assert_eq!(config.server.http_addr, "127.0.0.1:3000");
        assert!(!config.chain.log_build);
        // Other sections use defaults
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_validate_default() {
        assert!(StackworkConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_server_addr() {
        let config = StackworkConfig::builder()
            .server(ServerConfig {
                http_addr: "not-an-address".to_string(),
                ..Default::default()
            })
            .build();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http_addr"));
    }

    #[test]
    fn test_validate_zero_body_limit() {
        let config = StackworkConfig::builder()
            .server(ServerConfig {
                max_body_bytes: 0,
                ..Default::default()
            })
            .build_validated();

        assert!(config.unwrap_err().to_string().contains("max_body_bytes"));
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = StackworkConfig::default();
        config.logging.level = "WARN".to_string();
        assert!(config.validate().is_ok());

        config.logging.level = "loud".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("logging.level"));
    }

    #[test]
    fn test_presets() {
        let dev = StackworkConfig::development();
        assert_eq!(dev.chain, ChainConfig::debug());
        assert_eq!(dev.logging.format, LogFormat::Pretty);
        assert!(dev.logging.ansi_enabled);
        assert!(dev.validate().is_ok());

        let prod = StackworkConfig::production();
        assert!(!prod.chain.capture_debug);
        assert_eq!(prod.logging.level, "info");
        assert!(prod.validate().is_ok());
    }

    #[test]
    fn test_toml_roundtrip_sections() {
        let toml_str = toml::to_string_pretty(&StackworkConfig::default()).unwrap();
        assert!(toml_str.contains("[chain]"));
        assert!(toml_str.contains("[logging]"));
        assert!(toml_str.contains("[server]"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml_str = r"
            [chain]
            capture_debug = true
            record_everything = true
        ";

        let result: Result<StackworkConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }
}
