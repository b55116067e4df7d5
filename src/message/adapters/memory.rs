//! In-memory implementation of the `MessageRepository` port.
//!
//! Provides a thread-safe repository for tests without database
//! dependencies. Not suitable for production use.

use async_trait::async_trait;

use crate::asset::domain::{Asset, reference_counts};
use crate::ids::{MessageId, ProjectId, SessionId};
use crate::message::{
    domain::{Message, ProcessingStatus},
    ports::repository::MessageRepository,
};
use crate::paging::PageRequest;
use crate::persistence::{
    RepositoryError, RepositoryResult,
    memory::{InMemoryDatabase, Tables, keyset_page},
};

/// In-memory implementation of [`MessageRepository`].
///
/// Shares its tables with the other in-memory adapters built over the same
/// [`InMemoryDatabase`].
///
/// # Example
///
/// ```
/// use colloquy::message::adapters::memory::InMemoryMessageRepository;
/// use colloquy::persistence::memory::InMemoryDatabase;
///
/// let repo = InMemoryMessageRepository::new(InMemoryDatabase::new());
/// assert!(repo.is_empty());
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryMessageRepository {
    database: InMemoryDatabase,
}

impl InMemoryMessageRepository {
    /// Creates a repository over `database`.
    #[must_use]
    pub const fn new(database: InMemoryDatabase) -> Self {
        Self { database }
    }

    /// Returns the number of stored messages.
    ///
    /// Returns `0` if the internal lock is poisoned, matching the fallback
    /// behaviour of an empty repository.
    #[must_use]
    pub fn len(&self) -> usize {
        self.database
            .read()
            .map(|tables| tables.messages.len())
            .unwrap_or(0)
    }

    /// Returns `true` if no messages are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Tables {
    pub(crate) fn owns_session(&self, project_id: ProjectId, session_id: SessionId) -> bool {
        self.sessions
            .get(&session_id)
            .is_some_and(|session| session.project_id() == project_id)
    }

    /// Returns the latest message of the session by `(created_at, id)`.
    pub(crate) fn latest_message(&self, session_id: SessionId) -> Option<MessageId> {
        self.messages
            .values()
            .filter(|message| message.session_id() == session_id)
            .max_by_key(|message| message.cursor_key())
            .map(Message::id)
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn session_exists(
        &self,
        project_id: ProjectId,
        session_id: SessionId,
    ) -> RepositoryResult<bool> {
        Ok(self.database.read()?.owns_session(project_id, session_id))
    }

    async fn create(
        &self,
        project_id: ProjectId,
        message: &Message,
        referenced: &[Asset],
    ) -> RepositoryResult<Message> {
        let mut tables = self.database.write()?;

        if !tables.owns_session(project_id, message.session_id()) {
            return Err(RepositoryError::SessionNotFound(message.session_id()));
        }
        if tables.messages.contains_key(&message.id()) {
            return Err(RepositoryError::duplicate("message", message.id()));
        }

        let parent_id = tables.latest_message(message.session_id());
        let stored = message.clone().with_parent(parent_id);
        tables
            .messages
            .insert(stored.id(), stored.clone().with_parts(Vec::new()));
        tables.increment_references(project_id, &reference_counts(referenced));
        Ok(stored)
    }

    async fn list_page(
        &self,
        session_id: SessionId,
        request: &PageRequest,
    ) -> RepositoryResult<Vec<Message>> {
        let tables = self.database.read()?;
        let rows = tables
            .messages
            .values()
            .filter(|message| message.session_id() == session_id)
            .cloned();
        Ok(keyset_page(rows, request, Message::cursor_key))
    }

    async fn find_by_id(&self, id: MessageId) -> RepositoryResult<Option<Message>> {
        Ok(self.database.read()?.messages.get(&id).cloned())
    }

    async fn claim_pending(&self, session_id: SessionId) -> RepositoryResult<Vec<Message>> {
        let mut tables = self.database.write()?;
        let mut claimed: Vec<Message> = tables
            .messages
            .values_mut()
            .filter(|message| {
                message.session_id() == session_id
                    && message.processing_status() == ProcessingStatus::Pending
            })
            .map(|message| {
                *message = message
                    .clone()
                    .with_processing_status(ProcessingStatus::Running);
                message.clone()
            })
            .collect();
        claimed.sort_by_key(Message::cursor_key);
        Ok(claimed)
    }

    async fn release_to_pending(&self, ids: &[MessageId]) -> RepositoryResult<usize> {
        let mut tables = self.database.write()?;
        let mut released = 0;
        for id in ids {
            let Some(message) = tables.messages.get_mut(id) else {
                continue;
            };
            if message.processing_status() == ProcessingStatus::Running {
                *message = message
                    .clone()
                    .with_processing_status(ProcessingStatus::Pending);
                released += 1;
            }
        }
        Ok(released)
    }
}
