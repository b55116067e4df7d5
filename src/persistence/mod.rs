//! Persistence infrastructure shared by the bounded contexts.
//!
//! - [`error`]: the repository error type
//! - [`memory`]: the shared in-memory table set used by in-memory adapters
//! - [`postgres`]: connection pooling, blocking helpers, and the Diesel schema

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::{RepositoryError, RepositoryResult};
