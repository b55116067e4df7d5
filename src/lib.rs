//! Colloquy: a conversational message store.
//!
//! This crate accepts chat messages in several wire formats, normalizes
//! them to a canonical part list, and persists them with their attachments
//! held as content-addressed, reference-counted assets.
//!
//! # Architecture
//!
//! Colloquy follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, object
//!   storage, event channels)
//!
//! # Modules
//!
//! - [`asset`]: Content-addressed blobs and per-project reference counts
//! - [`message`]: Wire format codecs, validation, and the send/read pipeline
//! - [`session`]: Session lifecycle and cascading deletion
//! - [`task`]: Tasks extracted from sessions and their listing
//! - [`paging`]: Keyset cursors shared by every listing

pub mod asset;
pub mod config;
pub mod ids;
pub mod message;
pub mod paging;
pub mod persistence;
pub mod session;
pub mod task;
