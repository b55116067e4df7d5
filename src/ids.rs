//! Identifier newtypes shared across the session, message, and asset contexts.
//!
//! These types wrap UUIDs to prevent accidental mixing of identifiers that
//! belong to different entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID value.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        /// Generates a fresh random UUID on each call. Prefer `new()` when
        /// the intent to mint an identifier should be explicit.
        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_identifier!(
    /// Identifier of the project (tenant) that owns sessions and assets.
    ///
    /// # Examples
    ///
    /// ```
    /// use colloquy::ids::ProjectId;
    ///
    /// let id = ProjectId::new();
    /// assert!(!id.as_ref().is_nil());
    /// ```
    ProjectId
);

uuid_identifier!(
    /// Identifier of a conversational session.
    SessionId
);

uuid_identifier!(
    /// Identifier of the space a session may be connected to.
    SpaceId
);

uuid_identifier!(
    /// Identifier of one message within a session.
    MessageId
);

uuid_identifier!(
    /// Identifier of a task extracted from a session.
    TaskId
);
