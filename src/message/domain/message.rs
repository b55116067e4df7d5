//! The message aggregate.

use super::{part::Part, processing::ProcessingStatus, role::Role};
use crate::asset::domain::Asset;
use crate::ids::{MessageId, SessionId};
use crate::paging::Cursor;
use chrono::{DateTime, SubsecRound, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One turn in a session.
///
/// A message's content is written once and removed only when its session
/// is deleted; only the processing status changes afterwards. Its parts are
/// persisted out of row as one blob described by `parts_asset`; the row
/// itself never holds them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    session_id: SessionId,
    role: Role,
    #[serde(default)]
    parts: Vec<Part>,
    parts_asset: Asset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<Map<String, Value>>,
    parent_id: Option<MessageId>,
    #[serde(default)]
    processing_status: ProcessingStatus,
    created_at: DateTime<Utc>,
}

/// Stored fields used to rebuild a message from a row.
#[derive(Debug, Clone)]
pub struct PersistedMessage {
    /// Message identifier.
    pub id: MessageId,
    /// Owning session.
    pub session_id: SessionId,
    /// Canonical role.
    pub role: Role,
    /// Parts blob descriptor.
    pub parts_asset: Asset,
    /// Message-level metadata.
    pub meta: Option<Map<String, Value>>,
    /// Parent linkage hint.
    pub parent_id: Option<MessageId>,
    /// Task worker state.
    pub processing_status: ProcessingStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creates a new message stamped with the clock's current time.
    ///
    /// The timestamp is truncated to microseconds, the precision the
    /// database stores, so cursors built from either side agree.
    #[must_use]
    pub fn new(
        session_id: SessionId,
        role: Role,
        parts: Vec<Part>,
        parts_asset: Asset,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: MessageId::new(),
            session_id,
            role,
            parts,
            parts_asset,
            meta: None,
            parent_id: None,
            processing_status: ProcessingStatus::Pending,
            created_at: clock.utc().trunc_subsecs(6),
        }
    }

    /// Rebuilds a message from stored fields, with parts not yet loaded.
    #[must_use]
    pub fn from_persisted(data: PersistedMessage) -> Self {
        Self {
            id: data.id,
            session_id: data.session_id,
            role: data.role,
            parts: Vec::new(),
            parts_asset: data.parts_asset,
            meta: data.meta,
            parent_id: data.parent_id,
            processing_status: data.processing_status,
            created_at: data.created_at,
        }
    }

    /// Sets the message-level metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: Option<Map<String, Value>>) -> Self {
        self.meta = meta;
        self
    }

    /// Sets the parent linkage hint.
    #[must_use]
    pub const fn with_parent(mut self, parent_id: Option<MessageId>) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Sets the task worker state.
    #[must_use]
    pub const fn with_processing_status(mut self, status: ProcessingStatus) -> Self {
        self.processing_status = status;
        self
    }

    /// Replaces the materialized parts.
    #[must_use]
    pub fn with_parts(mut self, parts: Vec<Part>) -> Self {
        self.parts = parts;
        self
    }

    /// Returns the message identifier.
    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the owning session.
    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Returns the canonical role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns the materialized parts; empty until loaded from the blob.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Returns the parts blob descriptor.
    #[must_use]
    pub const fn parts_asset(&self) -> &Asset {
        &self.parts_asset
    }

    /// Returns the message-level metadata.
    #[must_use]
    pub const fn meta(&self) -> Option<&Map<String, Value>> {
        self.meta.as_ref()
    }

    /// Returns the message that was latest in the session at insert time.
    ///
    /// This is a linkage hint; ordering always follows `(created_at, id)`.
    #[must_use]
    pub const fn parent_id(&self) -> Option<MessageId> {
        self.parent_id
    }

    /// Returns the task worker state.
    #[must_use]
    pub const fn processing_status(&self) -> ProcessingStatus {
        self.processing_status
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the keyset position of this message.
    #[must_use]
    pub const fn cursor_key(&self) -> Cursor {
        Cursor::new(self.created_at, self.id.into_inner())
    }

    /// Returns every asset the message's parts point at.
    #[must_use]
    pub fn part_assets(&self) -> Vec<Asset> {
        self.parts
            .iter()
            .filter_map(|part| part.asset.clone())
            .collect()
    }
}
