//! Page requests and results for keyset listings.

use super::cursor::Cursor;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Order in which a listing walks the `(created_at, id)` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Oldest first; rows after the cursor compare greater.
    #[default]
    Ascending,
    /// Newest first; rows after the cursor compare smaller.
    Descending,
}

impl SortDirection {
    /// Maps the `time_desc` request flag onto a direction.
    #[must_use]
    pub const fn from_time_desc(time_desc: bool) -> Self {
        if time_desc {
            Self::Descending
        } else {
            Self::Ascending
        }
    }

    /// Returns `true` when `key` lies strictly after `cursor` in this direction.
    #[must_use]
    pub fn is_after(self, key: &Cursor, cursor: &Cursor) -> bool {
        match self {
            Self::Ascending => key > cursor,
            Self::Descending => key < cursor,
        }
    }
}

/// Errors raised for page sizes outside the accepted bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("limit {requested} is outside the accepted range 1..={max}")]
pub struct LimitError {
    /// The limit the caller asked for.
    pub requested: usize,
    /// The largest accepted limit.
    pub max: usize,
}

/// Bounds applied to caller-supplied page sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// Limit applied when the caller does not choose one.
    pub default_limit: usize,
    /// Largest limit a caller may request.
    pub max_limit: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 200,
        }
    }
}

impl PageLimits {
    /// Resolves an optional limit against these bounds.
    ///
    /// # Errors
    ///
    /// Returns [`LimitError`] when the limit is zero or above `max_limit`.
    pub const fn resolve(&self, limit: Option<usize>) -> Result<usize, LimitError> {
        let requested = match limit {
            Some(value) => value,
            None => self.default_limit,
        };
        if requested == 0 || requested > self.max_limit {
            return Err(LimitError {
                requested,
                max: self.max_limit,
            });
        }
        Ok(requested)
    }
}

/// One keyset page request as handed to repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    limit: usize,
    cursor: Option<Cursor>,
    direction: SortDirection,
}

impl PageRequest {
    /// Creates a request for the first page in the given direction.
    #[must_use]
    pub const fn first(limit: usize, direction: SortDirection) -> Self {
        Self {
            limit,
            cursor: None,
            direction,
        }
    }

    /// Resumes the listing after `cursor`.
    #[must_use]
    pub const fn after(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Returns the number of rows the caller will receive.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the number of rows a repository must fetch: one more than
    /// the page size, so the extra row signals that more data exists.
    #[must_use]
    pub const fn fetch_limit(&self) -> usize {
        self.limit.saturating_add(1)
    }

    /// Returns the cursor to resume after, if any.
    #[must_use]
    pub const fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// Returns the listing direction.
    #[must_use]
    pub const fn direction(&self) -> SortDirection {
        self.direction
    }
}

/// One page of a keyset listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Rows in listing order.
    pub items: Vec<T>,
    /// Token resuming after the last item, present when `has_more` is set.
    pub next_cursor: Option<String>,
    /// Whether rows exist beyond this page.
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Builds a page from up to `limit + 1` fetched rows.
    ///
    /// The extra row is dropped; the cursor points at the last row kept.
    #[must_use]
    pub fn from_fetched(mut rows: Vec<T>, limit: usize, key: impl Fn(&T) -> Cursor) -> Self {
        let has_more = rows.len() > limit;
        rows.truncate(limit);
        let next_cursor = if has_more {
            rows.last().map(|row| key(row).encode())
        } else {
            None
        };
        Self {
            items: rows,
            next_cursor,
            has_more,
        }
    }

    /// Maps the items while keeping the paging state.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            has_more: self.has_more,
        }
    }
}
