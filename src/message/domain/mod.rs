//! Domain types for the message subsystem.
//!
//! This module contains pure domain types with no infrastructure dependencies.
//! All types are immutable after construction and serialisable via serde.

mod attachment;
mod content;
mod event;
mod format;
mod message;
mod part;
mod processing;
mod role;

pub use crate::ids::{MessageId, ProjectId, SessionId};
pub use attachment::{AttachedFile, AttachedFiles};
pub use content::{Media, MediaKind, PartContent, ToolCall, ToolResult};
pub use event::MessageCreated;
pub use format::MessageFormat;
pub use message::{Message, PersistedMessage};
pub use part::{Part, PartType, meta_keys};
pub use processing::{ParseProcessingStatusError, ProcessingStatus};
pub use role::Role;
