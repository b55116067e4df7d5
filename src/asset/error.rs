//! Error types for object storage.

use std::time::Duration;
use thiserror::Error;

/// Result type for object storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by the object store and the asset store built on it.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Storage backend configuration is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Local filesystem I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The storage backend rejected the operation.
    #[error("storage operation failed: {0}")]
    OpenDal(#[from] opendal::Error),

    /// No object exists under the key.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The backend cannot produce presigned URLs.
    #[error("presigned URLs are not supported by the {0} backend")]
    PresignUnsupported(String),

    /// A stored blob could not be encoded or decoded.
    #[error("serialization error for {key}: {message}")]
    Serialization {
        /// Object key involved.
        key: String,
        /// Description of the failure.
        message: String,
    },

    /// The operation did not finish within the configured bound.
    #[error("{operation} of {key} timed out after {elapsed:?}")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
        /// Object key involved.
        key: String,
        /// Time waited before giving up.
        elapsed: Duration,
    },
}

impl StorageError {
    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a missing environment variable error.
    #[must_use]
    pub fn missing_env_var(var_name: impl Into<String>) -> Self {
        Self::MissingEnvVar(var_name.into())
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(key: impl Into<String>, message: impl ToString) -> Self {
        Self::Serialization {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Returns `true` when the object does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
