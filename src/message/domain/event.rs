//! Change notification emitted after a message commits.

use crate::ids::{MessageId, ProjectId, SessionId};
use serde::{Deserialize, Serialize};

/// Published once a message row is durable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCreated {
    /// Project owning the session.
    pub project_id: ProjectId,
    /// Session the message belongs to.
    pub session_id: SessionId,
    /// The new message.
    pub message_id: MessageId,
}

impl MessageCreated {
    /// Topic the notification is published on.
    pub const TOPIC: &'static str = "session.message.insert";
}
