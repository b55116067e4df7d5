//! Persistence adapters for the session context.
//!
//! - [`memory::InMemorySessionRepository`]: shared in-memory tables for tests
//! - [`postgres::PostgresSessionRepository`]: `PostgreSQL` via Diesel

pub mod memory;
pub mod postgres;

pub use memory::InMemorySessionRepository;
pub use postgres::PostgresSessionRepository;
