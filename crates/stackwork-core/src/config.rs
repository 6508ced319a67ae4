//! Chain construction settings.

use serde::{Deserialize, Serialize};

/// Settings that affect how a chain is built, never how it runs.
///
/// # Example
///
/// ```
/// use stackwork_core::ChainConfig;
///
/// let config = ChainConfig {
///     capture_debug: true,
///     log_build: false,
/// };
/// assert!(config.capture_debug);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    /// Record a descriptor per unit and the source location of the build call.
    #[serde(default = "default_capture_debug")]
    pub capture_debug: bool,

    /// Emit a `debug` event when a chain is built.
    #[serde(default = "default_log_build")]
    pub log_build: bool,
}

impl ChainConfig {
    /// Settings with debug capture and build logging on.
    #[must_use]
    pub const fn debug() -> Self {
        Self {
            capture_debug: true,
            log_build: true,
        }
    }

    /// Settings with everything off.
    #[must_use]
    pub const fn quiet() -> Self {
        Self {
            capture_debug: false,
            log_build: false,
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            capture_debug: default_capture_debug(),
            log_build: default_log_build(),
        }
    }
}

const fn default_capture_debug() -> bool {
    cfg!(debug_assertions)
}

const fn default_log_build() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_follows_build_profile() {
        let config = ChainConfig::default();
        assert_eq!(config.capture_debug, cfg!(debug_assertions));
        assert!(config.log_build);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ChainConfig = serde_json::from_str(r#"{"capture_debug": true}"#).unwrap();
        assert!(config.capture_debug);
        assert!(config.log_build);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<ChainConfig, _> = serde_json::from_str(r#"{"verbose": true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_presets() {
        assert!(ChainConfig::debug().capture_debug);
        assert!(!ChainConfig::quiet().log_build);
    }
}
