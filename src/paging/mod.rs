//! Keyset pagination shared by message, session, and task listings.
//!
//! Listings are ordered by the pair `(created_at, id)`, which is total even
//! when timestamps collide. A page is fetched with one extra lookahead row; that
//! row is the only signal for `has_more`, so no count query is ever issued.

mod cursor;
mod page;

pub use cursor::{Cursor, CursorError};
pub use page::{LimitError, Page, PageLimits, PageRequest, SortDirection};
