//! Error types for stackwork.
//!
//! This module provides the [`StackError`] type, the single error type shared by
//! the chain compiler, the context store and the units a chain runs.
//!
//! # Build-time vs request-time
//!
//! Most variants describe wiring mistakes. They are discovered once, either
//! while a chain is compiled or the first time a miswired path is exercised,
//! and are never worth retrying:
//!
//! | Variant | Raised | Meaning |
//! |---|---|---|
//! | `UnsupportedUnitKind` | build | a registered value exposes no unit shape |
//! | `DoubleInjection` | build | a context store would be attached twice |
//! | `ContextMissing` | request | a context-aware unit ran without a store |
//! | `NestedTransaction` | request | the store was reentered inside its own transaction |
//! | `Unit` | request | a user unit reported a failure |

use thiserror::Error;

/// Result type alias using [`StackError`].
pub type StackResult<T> = Result<T, StackError>;

/// Standard error type for stackwork.
///
/// # Example
///
/// ```
/// use stackwork_core::StackError;
///
/// let err = StackError::unsupported::<u32>();
/// assert!(err.is_build_error());
/// assert!(err.to_string().contains("u32"));
/// ```
#[derive(Error, Debug)]
pub enum StackError {
    /// A registered value matches none of the recognized unit shapes.
    #[error("unsupported unit kind: {type_name}")]
    UnsupportedUnitKind {
        /// Rust type name of the rejected value.
        type_name: &'static str,
    },

    /// A context store would be injected twice for one request.
    #[error("context injected twice: {detail}")]
    DoubleInjection {
        /// Where the second injection was attempted.
        detail: String,
    },

    /// A context-aware unit ran on a writer that carries no context store.
    #[error("context missing for unit {unit}; wrap the outermost chain with the context adapter")]
    ContextMissing {
        /// Type name of the unit that needed the store.
        unit: &'static str,
    },

    /// A transaction was opened, or the store was used through a `try_*`
    /// accessor, inside a transaction on the same store.
    #[error("nested transaction on the same context store")]
    NestedTransaction,

    /// A user unit failed while handling the request.
    #[error("unit failed: {0}")]
    Unit(#[from] anyhow::Error),
}

impl StackError {
    /// Creates an `UnsupportedUnitKind` error for the type `T`.
    #[must_use]
    pub fn unsupported<T: ?Sized>() -> Self {
        Self::UnsupportedUnitKind {
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Creates a `DoubleInjection` error.
    #[must_use]
    pub fn double_injection(detail: impl Into<String>) -> Self {
        Self::DoubleInjection {
            detail: detail.into(),
        }
    }

    /// Creates a `ContextMissing` error for the unit type `T`.
    #[must_use]
    pub fn context_missing<T: ?Sized>() -> Self {
        Self::ContextMissing {
            unit: std::any::type_name::<T>(),
        }
    }

    /// Wraps an arbitrary error reported by a user unit.
    #[must_use]
    pub fn unit<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unit(anyhow::Error::new(err))
    }

    /// Creates a unit failure from a plain message.
    #[must_use]
    pub fn unit_msg(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Unit(anyhow::Error::msg(message))
    }

    /// Returns `true` for errors raised while compiling a chain.
    #[must_use]
    pub const fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedUnitKind { .. } | Self::DoubleInjection { .. }
        )
    }

    /// Returns `true` for errors that indicate a wiring mistake rather than
    /// a failure reported by user code.
    #[must_use]
    pub const fn is_programmer_error(&self) -> bool {
        !matches!(self, Self::Unit(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    #[test]
    fn test_unsupported_names_type() {
        let err = StackError::unsupported::<Plain>();
        let msg = err.to_string();
        assert!(msg.contains("unsupported unit kind"));
        assert!(msg.contains("Plain"));
    }

    #[test]
    fn test_build_error_classification() {
        assert!(StackError::unsupported::<Plain>().is_build_error());
        assert!(StackError::double_injection("outer chain").is_build_error());
        assert!(!StackError::context_missing::<Plain>().is_build_error());
        assert!(!StackError::NestedTransaction.is_build_error());
        assert!(!StackError::unit_msg("boom").is_build_error());
    }

    #[test]
    fn test_programmer_error_classification() {
        assert!(StackError::NestedTransaction.is_programmer_error());
        assert!(StackError::context_missing::<Plain>().is_programmer_error());
        assert!(!StackError::unit_msg("boom").is_programmer_error());
    }

    #[test]
    fn test_context_missing_display() {
        let err = StackError::context_missing::<Plain>();
        assert!(err.to_string().contains("context missing"));
        assert!(err.to_string().contains("Plain"));
    }

    #[test]
    fn test_unit_wraps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = StackError::unit(io);
        assert!(err.to_string().contains("disk gone"));
        assert!(matches!(err, StackError::Unit(_)));
    }

    #[test]
    fn test_from_anyhow() {
        let err: StackError = anyhow::anyhow!("upstream").into();
        assert_eq!(err.to_string(), "unit failed: upstream");
    }
}
