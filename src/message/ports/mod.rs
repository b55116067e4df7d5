//! Port trait definitions for the message subsystem.
//!
//! Ports define the abstract interfaces that the domain requires from
//! infrastructure. Adapters implement these ports to connect the domain
//! to databases, event channels, and other infrastructure.

pub mod events;
pub mod repository;
pub mod validator;
pub mod worker;

pub use events::MessageEventPublisher;
pub use repository::MessageRepository;
pub use validator::{PartValidator, ValidationConfig};
pub use worker::{PendingBatch, PendingMessageHandler};
