//! Port trait definitions for the session context.

pub mod repository;

pub use repository::SessionRepository;
