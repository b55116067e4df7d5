//! Port for the background task worker fed by stored messages.

use crate::ids::{MessageId, SessionId};
use crate::message::domain::Message;
use async_trait::async_trait;

/// Messages claimed for one worker run.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingBatch {
    /// Session the messages belong to.
    pub session_id: SessionId,
    /// Claimed messages, oldest first, with parts loaded.
    pub messages: Vec<Message>,
    /// Messages just before the first claimed one, oldest first, with parts
    /// loaded. They were already processed and give the worker context.
    pub previous: Vec<Message>,
}

impl PendingBatch {
    /// Returns the identifiers of the claimed messages.
    #[must_use]
    pub fn ids(&self) -> Vec<MessageId> {
        self.messages.iter().map(Message::id).collect()
    }

    /// Returns `true` when nothing was claimed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Consumer of claimed messages, typically the task extractor.
#[async_trait]
pub trait PendingMessageHandler: Send + Sync {
    /// Error reported when a run fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Processes one claimed batch.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` when the run fails; the batch is then released
    /// back to pending.
    async fn handle(&self, batch: &PendingBatch) -> Result<(), Self::Error>;
}
