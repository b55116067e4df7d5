//! `PostgreSQL` connection pooling and blocking helpers.
//!
//! Provides utilities for offloading synchronous Diesel operations to a
//! dedicated thread pool, avoiding blocking the async executor.

pub mod schema;

use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};

use super::error::{RepositoryError, RepositoryResult};

/// `PostgreSQL` connection pool type.
pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Pooled connection type for internal use.
pub(crate) type PooledConn = PooledConnection<ConnectionManager<PgConnection>>;

/// Builds a connection pool for the given database URL.
///
/// # Errors
///
/// Returns [`RepositoryError::Connection`] when the pool cannot be created.
pub fn build_pool(database_url: &str, max_size: u32) -> RepositoryResult<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| RepositoryError::connection(e.to_string()))
}

/// Runs a blocking database operation on a dedicated thread pool.
///
/// Wraps the closure in [`tokio::task::spawn_blocking`] to prevent
/// blocking the async executor's worker threads.
pub(crate) async fn run_blocking<F, T>(f: F) -> RepositoryResult<T>
where
    F: FnOnce() -> RepositoryResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RepositoryError::connection(format!("task join error: {e}")))?
}

/// Obtains a connection from the pool.
pub(crate) fn get_conn(pool: &PgPool) -> RepositoryResult<PooledConn> {
    pool.get()
        .map_err(|e| RepositoryError::connection(e.to_string()))
}
