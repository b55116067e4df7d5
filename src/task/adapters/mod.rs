//! Task persistence adapters.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryTaskRepository;
pub use postgres::PostgresTaskRepository;
