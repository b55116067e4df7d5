//! Background processing state of a message.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Whether the task worker has picked a message up.
///
/// Messages start `Pending`. A worker claims them by moving them to
/// `Running`, and releases them back to `Pending` when its run fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Waiting for the task worker.
    #[default]
    Pending,
    /// Claimed by a task worker.
    Running,
}

impl ProcessingStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned while parsing a stored processing status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown processing status: {0}")]
pub struct ParseProcessingStatusError(pub String);

impl TryFrom<&str> for ProcessingStatus {
    type Error = ParseProcessingStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            other => Err(ParseProcessingStatusError(other.to_owned())),
        }
    }
}
