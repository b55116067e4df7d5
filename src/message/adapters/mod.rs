//! Adapters for the message module.
//!
//! This module provides concrete implementations of the [`MessageRepository`]
//! and [`MessageEventPublisher`] ports. Adapters handle all infrastructure
//! concerns while the domain remains pure.
//!
//! # Available Adapters
//!
//! - [`memory::InMemoryMessageRepository`]: Thread-safe in-memory storage for
//!   unit testing
//! - [`postgres::PostgresMessageRepository`]: `PostgreSQL` persistence using
//!   Diesel ORM
//! - [`broadcast::BroadcastEventPublisher`]: in-process notification channel
//!
//! [`MessageRepository`]: crate::message::ports::repository::MessageRepository
//! [`MessageEventPublisher`]: crate::message::ports::events::MessageEventPublisher

pub mod broadcast;
pub mod memory;
pub mod postgres;

pub use broadcast::BroadcastEventPublisher;
pub use memory::InMemoryMessageRepository;
pub use postgres::PostgresMessageRepository;
