//! Repository port for message persistence.
//!
//! Defines the abstract interface for storing and retrieving messages,
//! allowing different persistence implementations (`PostgreSQL`, in-memory, etc.).

use crate::asset::domain::Asset;
use crate::ids::{MessageId, ProjectId, SessionId};
use crate::message::domain::Message;
use crate::paging::PageRequest;
use crate::persistence::RepositoryResult;
use async_trait::async_trait;

/// Port for message persistence operations.
///
/// Rows hold the parts blob descriptor only; the parts themselves live in
/// the object store.
///
/// # Implementation Notes
///
/// Implementations must ensure:
/// - Message content is immutable after storage; only the processing
///   status is updated
/// - The parent lookup, the insert, and the reference-count increment
///   commit together
/// - Listings order by `(created_at, id)` so pages never skip or repeat rows
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Returns `true` when `session_id` exists and belongs to `project_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    async fn session_exists(
        &self,
        project_id: ProjectId,
        session_id: SessionId,
    ) -> RepositoryResult<bool>;

    /// Inserts `message`, linking it to the session's latest message.
    ///
    /// Within one transaction the latest message (by `created_at`, then id)
    /// becomes the parent, the row is inserted, and one reference is added
    /// for every asset in `referenced`. Returns the stored message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::SessionNotFound` when the session is gone,
    /// `RepositoryError::Duplicate` when the id is taken, or a database error.
    async fn create(
        &self,
        project_id: ProjectId,
        message: &Message,
        referenced: &[Asset],
    ) -> RepositoryResult<Message>;

    /// Returns up to `request.fetch_limit()` messages of the session after
    /// the request cursor, in the request direction.
    ///
    /// Returned messages carry no parts; callers materialize them from the
    /// parts blob.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    async fn list_page(
        &self,
        session_id: SessionId,
        request: &PageRequest,
    ) -> RepositoryResult<Vec<Message>>;

    /// Retrieves a message by its ID.
    ///
    /// Returns `None` if the message does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    async fn find_by_id(&self, id: MessageId) -> RepositoryResult<Option<Message>>;

    /// Claims every pending message of the session for the task worker.
    ///
    /// Within one transaction the session's `Pending` messages are moved to
    /// `Running` and returned oldest first, so two workers never claim the
    /// same message. Returned messages carry no parts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the update fails.
    async fn claim_pending(&self, session_id: SessionId) -> RepositoryResult<Vec<Message>>;

    /// Moves the `Running` messages among `ids` back to `Pending`.
    ///
    /// Returns how many messages were released. Unknown ids and messages
    /// that are not running are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the update fails.
    async fn release_to_pending(&self, ids: &[MessageId]) -> RepositoryResult<usize>;
}
