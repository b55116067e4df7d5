//! Messages: canonical parts, wire format codecs, and the send/read pipeline.
//!
//! Inbound messages arrive in one of several wire formats and are reduced
//! to an ordered list of canonical [`domain::Part`]s. Attachments are stored
//! as content-addressed assets, the part list is persisted as a single JSON
//! blob, and the message row only records that blob's descriptor. Each row
//! also tracks whether the task worker has claimed it.
//!
//! # Architecture
//!
//! The module follows hexagonal architecture principles:
//!
//! - **Domain**: Pure domain types ([`domain::Message`], [`domain::Part`], [`domain::Role`], etc.)
//! - **Codec**: Per-format normalizers and converters ([`codec::MessageCodec`])
//! - **Ports**: Abstract trait interfaces ([`ports::repository::MessageRepository`], [`ports::validator::PartValidator`], [`ports::worker::PendingMessageHandler`])
//! - **Adapters**: Concrete implementations ([`adapters::memory::InMemoryMessageRepository`], [`adapters::postgres::PostgresMessageRepository`])
//! - **Validation**: Per-part rule enforcement at ingestion boundaries
//! - **Services**: The [`services::MessagePipeline`]
//!
//! # Example
//!
//! ```
//! use colloquy::message::codec::CodecRegistry;
//! use colloquy::message::domain::{MessageFormat, PartType, Role};
//! use colloquy::message::validation::DefaultPartValidator;
//! use serde_json::json;
//!
//! let registry = CodecRegistry::standard();
//! let codec = registry.get(MessageFormat::OpenAi).expect("registered");
//! let normalized = codec
//!     .normalize_incoming(
//!         &json!({"role": "user", "content": "Hello!"}),
//!         &DefaultPartValidator::new(),
//!     )
//!     .expect("valid message");
//!
//! assert_eq!(normalized.role, Role::User);
//! assert_eq!(normalized.parts[0].kind, PartType::Text);
//! ```

pub mod adapters;
pub mod codec;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;
pub mod validation;
