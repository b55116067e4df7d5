//! In-process event channel backed by a tokio broadcast channel.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::message::{
    domain::MessageCreated, error::PublishError, ports::events::MessageEventPublisher,
};

/// Publishes [`MessageCreated`] events to in-process subscribers.
///
/// Publishing with no live subscriber is reported as
/// [`PublishError::NoSubscribers`]; the pipeline logs it and moves on.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<MessageCreated>,
}

impl BroadcastEventPublisher {
    /// Creates a channel buffering up to `capacity` unread events per
    /// subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Registers a new subscriber.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MessageCreated> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl MessageEventPublisher for BroadcastEventPublisher {
    async fn publish(&self, event: &MessageCreated) -> Result<(), PublishError> {
        self.sender
            .send(*event)
            .map(|_| ())
            .map_err(|_| PublishError::NoSubscribers(MessageCreated::TOPIC))
    }
}
