//! Task aggregate and status lifecycle.

use super::{ParseTaskStatusError, TaskDomainError, TaskId};
use crate::ids::{ProjectId, SessionId};
use crate::paging::Cursor;
use chrono::{DateTime, SubsecRound, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Task processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is waiting to be processed.
    Pending,
    /// Task is being processed.
    Running,
    /// Task finished successfully.
    Success,
    /// Task finished with a failure.
    Failed,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` when no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Returns `true` when moving from `self` to `next` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running | Self::Failed)
                | (Self::Running, Self::Success | Self::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// A unit of work derived from a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    session_id: SessionId,
    project_id: ProjectId,
    order: i32,
    status: TaskStatus,
    data: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Data required to reconstruct a persisted task aggregate.
#[derive(Debug, Clone)]
pub struct PersistedTaskData {
    /// Task identifier.
    pub id: TaskId,
    /// Owning session.
    pub session_id: SessionId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Position within the session.
    pub order: i32,
    /// Current status.
    pub status: TaskStatus,
    /// Task payload.
    pub data: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a pending task.
    #[must_use]
    pub fn new(
        session_id: SessionId,
        project_id: ProjectId,
        order: i32,
        data: Value,
        clock: &impl Clock,
    ) -> Self {
        let now = clock.utc().trunc_subsecs(6);
        Self {
            id: TaskId::new(),
            session_id,
            project_id,
            order,
            status: TaskStatus::Pending,
            data,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            session_id: data.session_id,
            project_id: data.project_id,
            order: data.order,
            status: data.status,
            data: data.data,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning session.
    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the position within the session.
    #[must_use]
    pub const fn order(&self) -> i32 {
        self.order
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the task payload.
    #[must_use]
    pub const fn data(&self) -> &Value {
        &self.data
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the keyset position of this task.
    #[must_use]
    pub const fn cursor_key(&self) -> Cursor {
        Cursor::new(self.created_at, self.id.into_inner())
    }

    /// Moves the task to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] when the status
    /// machine does not allow the change.
    pub fn transition_to(
        &mut self,
        next: TaskStatus,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if !self.status.can_transition_to(next) {
            return Err(TaskDomainError::InvalidTransition {
                task_id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = clock.utc().trunc_subsecs(6);
        Ok(())
    }
}
