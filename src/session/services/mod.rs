//! Application services for the session context.

pub mod lifecycle;

pub use lifecycle::{
    CreateSessionRequest, ListSessionsRequest, SessionService, SessionServiceError,
    SessionServiceResult,
};
