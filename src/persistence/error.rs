//! Repository error type shared by session, message, and asset adapters.
//!
//! The message insert and the reference-count increment commit in one
//! transaction, and session deletion spans sessions and messages, so these
//! adapters report through a single error type.

use crate::ids::{ProjectId, SessionId};
use std::sync::Arc;
use thiserror::Error;

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors that can occur during persistence.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// The session does not exist or belongs to another project.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// No row with the identifier exists.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of row looked up.
        entity: &'static str,
        /// Identifier that was not found.
        id: String,
    },

    /// A row with the same identifier already exists.
    #[error("duplicate {entity}: {id}")]
    Duplicate {
        /// Kind of row that collided.
        entity: &'static str,
        /// Identifier of the colliding row.
        id: String,
    },

    /// A decrement would drive a reference count below zero.
    ///
    /// This signals a bookkeeping bug elsewhere; the whole batch is rolled
    /// back rather than clamped.
    #[error(
        "reference count underflow for {sha256} in project {project_id}: \
         current {current}, requested decrement {requested}"
    )]
    ReferenceUnderflow {
        /// Project owning the counter.
        project_id: ProjectId,
        /// Content address of the counter.
        sha256: String,
        /// Count stored before the batch, zero when no row exists.
        current: i64,
        /// Amount the batch tried to subtract.
        requested: i64,
    },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(Arc<dyn std::error::Error + Send + Sync>),

    /// A serialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A connection error occurred.
    #[error("connection error: {0}")]
    Connection(String),
}

impl RepositoryError {
    /// Creates a database error from any error type.
    #[must_use]
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Database(Arc::new(err))
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Creates a missing-row error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Creates a duplicate-row error.
    #[must_use]
    pub fn duplicate(entity: &'static str, id: impl ToString) -> Self {
        Self::Duplicate {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<diesel::result::Error> for RepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        Self::database(err)
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
