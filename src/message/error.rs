//! Error types for message validation, publishing, and the pipeline.
//!
//! Uses `thiserror` for ergonomic error handling with typed variants
//! that can be inspected by callers.

use crate::asset::error::StorageError;
use crate::ids::SessionId;
use crate::paging::{CursorError, LimitError};
use crate::persistence::RepositoryError;
use thiserror::Error;

/// Errors raised while normalizing or validating an inbound message.
///
/// Always surfaced to the caller and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The format selector is not one of the supported values.
    #[error("unsupported message format '{0}'")]
    UnsupportedFormat(String),

    /// The message normalized to zero parts.
    #[error("message must contain at least one part")]
    EmptyParts,

    /// The message has too many parts.
    #[error("message has {actual} parts, exceeds limit of {max}")]
    TooManyParts {
        /// The maximum allowed number of parts.
        max: usize,
        /// The actual number of parts.
        actual: usize,
    },

    /// A part lacks a field its type requires.
    #[error("part {index} is missing required field '{field}'")]
    MissingPartField {
        /// The index of the offending part.
        index: usize,
        /// The missing field.
        field: &'static str,
    },

    /// A part or wire block has invalid structure.
    #[error("invalid part at index {index}: {reason}")]
    InvalidPart {
        /// The index of the offending part.
        index: usize,
        /// Description of the validation failure.
        reason: String,
    },

    /// The role is not permitted by the selected format.
    #[error("role '{role}' is not allowed in the {format} format")]
    DisallowedRole {
        /// The offending role.
        role: String,
        /// The selected format.
        format: &'static str,
    },

    /// The role is not recognized.
    #[error("unknown role '{0}'")]
    UnknownRole(String),

    /// The body does not have the shape of a message.
    #[error("malformed message body: {0}")]
    MalformedBody(String),

    /// A part names a multipart field the request did not supply.
    #[error("missing attached file for field '{field}'")]
    MissingAttachment {
        /// The unresolved field name.
        field: String,
    },

    /// A multipart field reuses the name of a decoded inline payload.
    #[error("attached file field '{field}' collides with an inline payload")]
    ReservedField {
        /// The colliding field name.
        field: String,
    },

    /// The pagination cursor could not be decoded.
    #[error(transparent)]
    InvalidCursor(#[from] CursorError),

    /// The page limit is out of range.
    #[error(transparent)]
    InvalidLimit(#[from] LimitError),

    /// Multiple validation errors occurred.
    #[error("multiple validation errors: {}", format_errors(.0))]
    Multiple(Vec<Self>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Creates a validation error for an invalid part.
    #[must_use]
    pub fn invalid_part(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidPart {
            index,
            reason: reason.into(),
        }
    }

    /// Creates a missing-field error for a part.
    #[must_use]
    pub const fn missing_field(index: usize, field: &'static str) -> Self {
        Self::MissingPartField { index, field }
    }

    /// Creates a malformed-body error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedBody(reason.into())
    }

    /// Combines multiple validation errors into a single error.
    ///
    /// A single error is returned unwrapped. An empty vector is a caller
    /// bug and yields [`ValidationError::EmptyParts`] in release builds.
    #[must_use]
    pub fn multiple(mut errors: Vec<Self>) -> Self {
        match errors.len() {
            0 => {
                debug_assert!(false, "multiple() called with empty errors vector");
                Self::EmptyParts
            }
            1 => errors.pop().unwrap_or(Self::EmptyParts),
            _ => Self::Multiple(errors),
        }
    }

    /// Returns `true` if this error represents multiple validation failures.
    #[must_use]
    pub const fn is_multiple(&self) -> bool {
        matches!(self, Self::Multiple(_))
    }

    /// Returns the individual errors if this is a `Multiple` variant.
    #[must_use]
    pub fn errors(&self) -> Option<&[Self]> {
        match self {
            Self::Multiple(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Errors raised by an event publisher.
#[derive(Debug, Clone, Error)]
pub enum PublishError {
    /// No subscriber is listening on the channel.
    #[error("no subscribers for topic '{0}'")]
    NoSubscribers(&'static str),

    /// The channel rejected the event.
    #[error("publish failed: {0}")]
    Channel(String),
}

/// Errors returned by the message pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The inbound message or read parameters are invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The session does not exist or belongs to another project.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// An object-store call failed before the message committed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A database call failed.
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for PipelineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::SessionNotFound(id) => Self::SessionNotFound(id),
            other => Self::Repository(other),
        }
    }
}

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors returned while handing pending messages to a task worker.
#[derive(Debug, Error)]
pub enum ProcessingError<E> {
    /// Claiming or releasing the messages failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The worker failed; its messages are pending again.
    #[error("task worker failed, {released} messages released: {source}")]
    Worker {
        /// The worker's error.
        #[source]
        source: E,
        /// Number of messages moved back to pending.
        released: usize,
    },
}
