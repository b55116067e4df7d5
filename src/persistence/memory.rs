//! Shared in-memory table set backing the in-memory adapters.
//!
//! Every in-memory repository holds a handle to the same
//! [`InMemoryDatabase`], so an operation that spans tables (message insert
//! plus reference increment, session delete plus message cascade) runs under
//! a single write lock and is atomic in the same way a database transaction
//! is.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::error::{RepositoryError, RepositoryResult};
use crate::ids::{MessageId, ProjectId, SessionId};
use crate::message::domain::Message;
use crate::paging::{Cursor, PageRequest, SortDirection};
use crate::session::domain::Session;
use crate::task::domain::{Task, TaskId};

/// Rows held by the in-memory database.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) sessions: HashMap<SessionId, Session>,
    /// Message rows; parts are never stored here, only the parts blob asset.
    pub(crate) messages: HashMap<MessageId, Message>,
    pub(crate) references: HashMap<(ProjectId, String), i64>,
    pub(crate) tasks: HashMap<TaskId, Task>,
}

/// Thread-safe handle to a shared in-memory table set.
///
/// Cloning the handle shares the underlying tables.
///
/// # Examples
///
/// ```
/// use colloquy::persistence::memory::InMemoryDatabase;
///
/// let database = InMemoryDatabase::new();
/// let shared = database.clone();
/// # let _ = shared;
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatabase {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryDatabase {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| RepositoryError::connection(format!("lock poisoned: {e}")))
    }

    pub(crate) fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| RepositoryError::connection(format!("lock poisoned: {e}")))
    }
}

/// Applies keyset filtering, ordering, and the fetch limit to `rows`.
pub(crate) fn keyset_page<T>(
    rows: impl IntoIterator<Item = T>,
    request: &PageRequest,
    key: impl Fn(&T) -> Cursor,
) -> Vec<T> {
    let direction = request.direction();
    let mut selected: Vec<T> = rows
        .into_iter()
        .filter(|row| {
            request
                .cursor()
                .is_none_or(|cursor| direction.is_after(&key(row), cursor))
        })
        .collect();

    selected.sort_by_key(|row| key(row));
    if direction == SortDirection::Descending {
        selected.reverse();
    }
    selected.truncate(request.fetch_limit());
    selected
}
