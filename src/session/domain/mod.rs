//! Domain types for the session context.

mod session;

pub use crate::ids::{ProjectId, SessionId, SpaceId};
pub use session::{PersistedSession, Session, SpaceFilter};
