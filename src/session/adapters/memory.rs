//! In-memory implementation of the `SessionRepository` port.

use async_trait::async_trait;

use crate::asset::domain::Asset;
use crate::ids::{ProjectId, SessionId};
use crate::paging::PageRequest;
use crate::persistence::{
    RepositoryError, RepositoryResult,
    memory::{InMemoryDatabase, keyset_page},
};
use crate::session::{
    domain::{Session, SpaceFilter},
    ports::SessionRepository,
};

/// In-memory implementation of [`SessionRepository`].
///
/// Deleting a session removes its messages and tasks under the same lock,
/// mirroring the database cascade.
#[derive(Debug, Default, Clone)]
pub struct InMemorySessionRepository {
    database: InMemoryDatabase,
}

impl InMemorySessionRepository {
    /// Creates a repository over `database`.
    #[must_use]
    pub const fn new(database: InMemoryDatabase) -> Self {
        Self { database }
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create(&self, session: &Session) -> RepositoryResult<()> {
        let mut tables = self.database.write()?;
        if tables.sessions.contains_key(&session.id()) {
            return Err(RepositoryError::duplicate("session", session.id()));
        }
        tables.sessions.insert(session.id(), session.clone());
        Ok(())
    }

    async fn find(
        &self,
        project_id: ProjectId,
        session_id: SessionId,
    ) -> RepositoryResult<Option<Session>> {
        let tables = self.database.read()?;
        Ok(tables
            .sessions
            .get(&session_id)
            .filter(|session| session.project_id() == project_id)
            .cloned())
    }

    async fn update(&self, session: &Session) -> RepositoryResult<()> {
        let mut tables = self.database.write()?;
        let stored = tables
            .sessions
            .get_mut(&session.id())
            .filter(|stored| stored.project_id() == session.project_id())
            .ok_or_else(|| RepositoryError::SessionNotFound(session.id()))?;
        *stored = session.clone();
        Ok(())
    }

    async fn list_page(
        &self,
        project_id: ProjectId,
        filter: SpaceFilter,
        request: &PageRequest,
    ) -> RepositoryResult<Vec<Session>> {
        let tables = self.database.read()?;
        let rows = tables
            .sessions
            .values()
            .filter(|session| session.project_id() == project_id && session.matches(filter))
            .cloned();
        Ok(keyset_page(rows, request, Session::cursor_key))
    }

    async fn delete_cascade(
        &self,
        project_id: ProjectId,
        session_id: SessionId,
    ) -> RepositoryResult<Vec<Asset>> {
        let mut tables = self.database.write()?;
        if !tables.owns_session(project_id, session_id) {
            return Err(RepositoryError::SessionNotFound(session_id));
        }

        let mut parts_assets = Vec::new();
        tables.messages.retain(|_, message| {
            if message.session_id() == session_id {
                parts_assets.push(message.parts_asset().clone());
                false
            } else {
                true
            }
        });
        tables.tasks.retain(|_, task| task.session_id() != session_id);
        tables.sessions.remove(&session_id);
        Ok(parts_assets)
    }
}
