//! Repository port for session persistence.

use async_trait::async_trait;

use crate::asset::domain::Asset;
use crate::ids::{ProjectId, SessionId};
use crate::paging::PageRequest;
use crate::persistence::RepositoryResult;
use crate::session::domain::{Session, SpaceFilter};

/// Port for session persistence operations.
///
/// Every lookup is scoped by project; a session of another project is
/// indistinguishable from a missing one.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Stores a new session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Duplicate` when the id is taken.
    async fn create(&self, session: &Session) -> RepositoryResult<()>;

    /// Finds a session of the project.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    async fn find(
        &self,
        project_id: ProjectId,
        session_id: SessionId,
    ) -> RepositoryResult<Option<Session>>;

    /// Persists the mutable fields of an existing session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::SessionNotFound` when the row is gone.
    async fn update(&self, session: &Session) -> RepositoryResult<()>;

    /// Returns up to `request.fetch_limit()` sessions of the project that
    /// pass `filter`, after the request cursor in the request direction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    async fn list_page(
        &self,
        project_id: ProjectId,
        filter: SpaceFilter,
        request: &PageRequest,
    ) -> RepositoryResult<Vec<Session>>;

    /// Deletes the session with its messages and tasks in one transaction.
    ///
    /// Returns the parts blob descriptor of every deleted message, one entry
    /// per message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::SessionNotFound` when the session is not in
    /// the project, or a database error.
    async fn delete_cascade(
        &self,
        project_id: ProjectId,
        session_id: SessionId,
    ) -> RepositoryResult<Vec<Asset>>;
}
