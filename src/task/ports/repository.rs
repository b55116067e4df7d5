//! Repository port for task persistence and listing.

use crate::ids::SessionId;
use crate::paging::PageRequest;
use crate::persistence::RepositoryResult;
use crate::task::domain::{Task, TaskId};
use async_trait::async_trait;

/// Task persistence contract.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Duplicate` when the task ID already exists
    /// and `RepositoryError::SessionNotFound` when the session is gone.
    async fn store(&self, task: &Task) -> RepositoryResult<()>;

    /// Persists the status and update timestamp of an existing task.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` when the task does not exist or the write
    /// fails.
    async fn update_status(&self, task: &Task) -> RepositoryResult<()>;

    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_by_id(&self, id: TaskId) -> RepositoryResult<Option<Task>>;

    /// Returns up to `request.fetch_limit()` tasks of the session after the
    /// request cursor, ordered by `(created_at, id)` in the request
    /// direction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    async fn list_by_session(
        &self,
        session_id: SessionId,
        request: &PageRequest,
    ) -> RepositoryResult<Vec<Task>>;
}
