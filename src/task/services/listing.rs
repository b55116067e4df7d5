//! Service layer for session task listing and status updates.

use crate::ids::SessionId;
use crate::message::error::ValidationError;
use crate::paging::{Cursor, Page, PageLimits, PageRequest, SortDirection};
use crate::persistence::RepositoryError;
use crate::task::{
    domain::{Task, TaskDomainError, TaskId, TaskStatus},
    ports::TaskRepository,
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Service-level errors for task operations.
#[derive(Debug, Error)]
pub enum TaskServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Listing parameters are invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result type for task service operations.
pub type TaskServiceResult<T> = Result<T, TaskServiceError>;

/// Task listing and status orchestration service.
pub struct TaskService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    page_limits: PageLimits,
}

impl<R, C> TaskService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new task service.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            repository,
            clock,
            page_limits: PageLimits::default(),
        }
    }

    /// Replaces the listing page bounds.
    #[must_use]
    pub const fn with_page_limits(mut self, page_limits: PageLimits) -> Self {
        self.page_limits = page_limits;
        self
    }

    /// Stores a task produced by the background worker.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Repository`] when the session is gone or
    /// the id is taken.
    pub async fn store(&self, task: &Task) -> TaskServiceResult<()> {
        self.repository.store(task).await?;
        Ok(())
    }

    /// Moves a task to `status`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::NotFound`] for an unknown task and
    /// [`TaskServiceError::Domain`] for a disallowed transition.
    pub async fn update_status(&self, id: TaskId, status: TaskStatus) -> TaskServiceResult<Task> {
        let mut task = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(TaskServiceError::NotFound(id))?;
        task.transition_to(status, &*self.clock)?;
        self.repository.update_status(&task).await?;
        Ok(task)
    }

    /// Lists a session's tasks newest first.
    ///
    /// An absent cursor starts from the newest task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Validation`] for a bad limit or a foreign
    /// cursor, and [`TaskServiceError::Repository`] when the query fails.
    pub async fn get_tasks(
        &self,
        session_id: SessionId,
        limit: Option<usize>,
        cursor: Option<&str>,
    ) -> TaskServiceResult<Page<Task>> {
        let resolved = self
            .page_limits
            .resolve(limit)
            .map_err(ValidationError::from)?;
        let after = Cursor::decode_optional(cursor).map_err(ValidationError::from)?;
        let request = PageRequest::first(resolved, SortDirection::Descending).after(after);

        let rows = self.repository.list_by_session(session_id, &request).await?;
        Ok(Page::from_fetched(rows, resolved, Task::cursor_key))
    }
}
