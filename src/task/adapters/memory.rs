//! In-memory task repository for tests and local development.

use async_trait::async_trait;

use crate::ids::SessionId;
use crate::paging::PageRequest;
use crate::persistence::{
    RepositoryError, RepositoryResult,
    memory::{InMemoryDatabase, keyset_page},
};
use crate::task::{
    domain::{Task, TaskId},
    ports::TaskRepository,
};

/// Thread-safe in-memory task repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    database: InMemoryDatabase,
}

impl InMemoryTaskRepository {
    /// Creates a repository over `database`.
    #[must_use]
    pub const fn new(database: InMemoryDatabase) -> Self {
        Self { database }
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn store(&self, task: &Task) -> RepositoryResult<()> {
        let mut tables = self.database.write()?;
        if !tables.owns_session(task.project_id(), task.session_id()) {
            return Err(RepositoryError::SessionNotFound(task.session_id()));
        }
        if tables.tasks.contains_key(&task.id()) {
            return Err(RepositoryError::duplicate("task", task.id()));
        }
        tables.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn update_status(&self, task: &Task) -> RepositoryResult<()> {
        let mut tables = self.database.write()?;
        let Some(stored) = tables.tasks.get_mut(&task.id()) else {
            return Err(RepositoryError::not_found("task", task.id()));
        };
        *stored = task.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> RepositoryResult<Option<Task>> {
        Ok(self.database.read()?.tasks.get(&id).cloned())
    }

    async fn list_by_session(
        &self,
        session_id: SessionId,
        request: &PageRequest,
    ) -> RepositoryResult<Vec<Task>> {
        let tables = self.database.read()?;
        let rows = tables
            .tasks
            .values()
            .filter(|task| task.session_id() == session_id)
            .cloned();
        Ok(keyset_page(rows, request, Task::cursor_key))
    }
}
