//! Error types for Veneer
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! The taxonomy is deliberately small:
//! - `Validation`: a value failed a schema definition's cast/validate step.
//!   Carries the offending path and the definition's type tag, and always
//!   propagates to the caller of the mutating method.
//! - `Storage`: wraps any failure from the underlying relational engine
//!   behind a single shape so collaborators never see engine-specific errors.

use crate::path::PathParseError;
use thiserror::Error;

/// Result type alias for Veneer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the document layer
#[derive(Debug, Error)]
pub enum Error {
    /// A value failed validation against a schema definition
    #[error("validation failed at '{path}' (expected {expected}): {reason}")]
    Validation {
        /// Dotted path of the offending value
        path: String,
        /// Type tag of the definition that rejected the value
        expected: &'static str,
        /// Human-readable rejection reason
        reason: String,
    },

    /// Failure from the underlying relational engine
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid operation or state
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Malformed document path
    #[error("path error: {0}")]
    PathParse(#[from] PathParseError),
}

impl Error {
    /// Build a validation error for `path` against a definition's type tag
    pub fn validation(
        path: impl Into<String>,
        expected: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Error::Validation {
            path: path.into(),
            expected,
            reason: reason.into(),
        }
    }

    /// Wrap an engine failure
    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage(message.into())
    }

    /// True if this is a validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
