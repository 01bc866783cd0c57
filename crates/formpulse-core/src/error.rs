//! Error types for FormPulse core operations.
//!
//! Validation happens once at the type boundary ([`Confidence::new`],
//! [`LandmarkType::try_from`]); the per-frame hot path never constructs
//! errors for missing or low-visibility input — those are skipped upstream.
//!
//! [`Confidence::new`]: crate::types::Confidence::new
//! [`LandmarkType::try_from`]: crate::types::LandmarkType

use thiserror::Error;

/// A specialized `Result` type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors produced by FormPulse core types.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// Validation error for input data
    #[error("Validation error: {message}")]
    Validation {
        /// Description of what validation failed
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
    },
}

impl CoreError {
    /// Creates a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
