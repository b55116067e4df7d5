//! Event channel port for change notifications.

use crate::message::{domain::MessageCreated, error::PublishError};
use async_trait::async_trait;

/// Fire-and-forget publisher for message notifications.
///
/// The pipeline calls this only after the message has committed and bounds
/// the wait; a failure is logged and never unwinds the message.
#[async_trait]
pub trait MessageEventPublisher: Send + Sync {
    /// Publishes `event` on [`MessageCreated::TOPIC`].
    ///
    /// # Errors
    ///
    /// Returns `PublishError` when the channel rejects the event.
    async fn publish(&self, event: &MessageCreated) -> Result<(), PublishError>;
}
