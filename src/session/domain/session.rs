//! The session aggregate.

use chrono::{DateTime, SubsecRound, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::{ProjectId, SessionId, SpaceId};
use crate::paging::Cursor;

/// A conversation owned by a project, optionally connected to a space.
///
/// Sessions own their messages and tasks; deleting a session removes both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    project_id: ProjectId,
    space_id: Option<SpaceId>,
    configs: Map<String, Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Stored fields used to rebuild a session from a row.
#[derive(Debug, Clone)]
pub struct PersistedSession {
    /// Session identifier.
    pub id: SessionId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Connected space, if any.
    pub space_id: Option<SpaceId>,
    /// Opaque configuration.
    pub configs: Map<String, Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates a new session stamped with the clock's current time.
    ///
    /// # Examples
    ///
    /// ```
    /// use colloquy::session::domain::{ProjectId, Session};
    /// use mockable::DefaultClock;
    /// use serde_json::Map;
    ///
    /// let session = Session::new(ProjectId::new(), None, Map::new(), &DefaultClock);
    /// assert_eq!(session.created_at(), session.updated_at());
    /// assert!(session.space_id().is_none());
    /// ```
    #[must_use]
    pub fn new(
        project_id: ProjectId,
        space_id: Option<SpaceId>,
        configs: Map<String, Value>,
        clock: &impl Clock,
    ) -> Self {
        let now = clock.utc().trunc_subsecs(6);
        Self {
            id: SessionId::new(),
            project_id,
            space_id,
            configs,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a session from stored fields.
    #[must_use]
    pub fn from_persisted(data: PersistedSession) -> Self {
        Self {
            id: data.id,
            project_id: data.project_id,
            space_id: data.space_id,
            configs: data.configs,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Replaces the configuration.
    pub fn update_configs(&mut self, configs: Map<String, Value>, clock: &impl Clock) {
        self.configs = configs;
        self.touch(clock);
    }

    /// Connects the session to `space_id`.
    pub fn connect_to_space(&mut self, space_id: SpaceId, clock: &impl Clock) {
        self.space_id = Some(space_id);
        self.touch(clock);
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc().trunc_subsecs(6);
    }

    /// Returns the session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the connected space.
    #[must_use]
    pub const fn space_id(&self) -> Option<SpaceId> {
        self.space_id
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn configs(&self) -> &Map<String, Value> {
        &self.configs
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the keyset position of this session.
    #[must_use]
    pub const fn cursor_key(&self) -> Cursor {
        Cursor::new(self.created_at, self.id.into_inner())
    }

    /// Returns `true` when the session passes `filter`.
    #[must_use]
    pub fn matches(&self, filter: SpaceFilter) -> bool {
        match filter {
            SpaceFilter::Any => true,
            SpaceFilter::Space(space_id) => self.space_id == Some(space_id),
            SpaceFilter::NotConnected => self.space_id.is_none(),
        }
    }
}

/// Space restriction applied to session listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpaceFilter {
    /// Every session of the project.
    #[default]
    Any,
    /// Sessions connected to one space.
    Space(SpaceId),
    /// Sessions not connected to any space.
    NotConnected,
}
