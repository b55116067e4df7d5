//! Session lifecycle: create, read, update, list, and delete.
//!
//! Deletion removes the session, its messages, and its tasks in one
//! transaction, then releases one asset reference for every parts blob and
//! every attachment those messages held.

use std::collections::HashMap;
use std::sync::Arc;

use mockable::Clock;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::asset::{
    domain::Asset,
    ports::{AssetReferenceRepository, ObjectStore},
    services::AssetStore,
};
use crate::ids::{ProjectId, SessionId, SpaceId};
use crate::message::{domain::Part, error::ValidationError};
use crate::paging::{Cursor, Page, PageLimits, PageRequest, SortDirection};
use crate::persistence::RepositoryError;
use crate::session::{
    domain::{Session, SpaceFilter},
    ports::SessionRepository,
};

/// Service-level errors for session operations.
#[derive(Debug, Error)]
pub enum SessionServiceError {
    /// The session does not exist or belongs to another project.
    #[error("session not found: {0}")]
    NotFound(SessionId),

    /// Listing parameters are invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A database call failed.
    #[error(transparent)]
    Repository(RepositoryError),

    /// The session was deleted but its asset references were not released.
    ///
    /// The deletion stands; the counters need reconciliation.
    #[error("session {session_id} deleted but asset references leaked: {source}")]
    LeakedReferences {
        /// The deleted session.
        session_id: SessionId,
        /// Why the decrement failed.
        source: RepositoryError,
    },
}

impl From<RepositoryError> for SessionServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::SessionNotFound(id) => Self::NotFound(id),
            other => Self::Repository(other),
        }
    }
}

/// Result type for session service operations.
pub type SessionServiceResult<T> = Result<T, SessionServiceError>;

/// Request payload for creating a session.
#[derive(Debug, Clone, Default)]
pub struct CreateSessionRequest {
    /// Owning project.
    pub project_id: ProjectId,
    /// Space to connect the session to.
    pub space_id: Option<SpaceId>,
    /// Opaque configuration.
    pub configs: Map<String, Value>,
}

impl CreateSessionRequest {
    /// Creates a request for an unconnected session with empty configuration.
    #[must_use]
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            ..Self::default()
        }
    }

    /// Connects the new session to `space_id`.
    #[must_use]
    pub const fn in_space(mut self, space_id: SpaceId) -> Self {
        self.space_id = Some(space_id);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_configs(mut self, configs: Map<String, Value>) -> Self {
        self.configs = configs;
        self
    }
}

/// Request payload for listing sessions.
#[derive(Debug, Clone, Default)]
pub struct ListSessionsRequest {
    /// Owning project.
    pub project_id: ProjectId,
    /// Space restriction.
    pub filter: SpaceFilter,
    /// Page size; absent means the configured default.
    pub limit: Option<usize>,
    /// Opaque cursor from a previous page.
    pub cursor: Option<String>,
    /// List newest first when `true`.
    pub time_desc: bool,
}

impl ListSessionsRequest {
    /// Creates a request for the first page of every session in the project.
    #[must_use]
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            ..Self::default()
        }
    }

    /// Restricts the listing.
    #[must_use]
    pub const fn with_filter(mut self, filter: SpaceFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the page size.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Continues after `cursor`.
    #[must_use]
    pub fn after(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Lists newest first.
    #[must_use]
    pub const fn newest_first(mut self) -> Self {
        self.time_desc = true;
        self
    }
}

/// Session lifecycle orchestration service.
pub struct SessionService<S, O, A, C>
where
    S: SessionRepository,
    O: ObjectStore,
    A: AssetReferenceRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<S>,
    assets: AssetStore<O>,
    references: Arc<A>,
    clock: Arc<C>,
    page_limits: PageLimits,
}

impl<S, O, A, C> SessionService<S, O, A, C>
where
    S: SessionRepository,
    O: ObjectStore,
    A: AssetReferenceRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new session service.
    #[must_use]
    pub fn new(
        repository: Arc<S>,
        assets: AssetStore<O>,
        references: Arc<A>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            repository,
            assets,
            references,
            clock,
            page_limits: PageLimits::default(),
        }
    }

    /// Replaces the listing page bounds.
    #[must_use]
    pub const fn with_page_limits(mut self, page_limits: PageLimits) -> Self {
        self.page_limits = page_limits;
        self
    }

    /// Creates a session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::Repository`] when the insert fails.
    pub async fn create(&self, request: CreateSessionRequest) -> SessionServiceResult<Session> {
        let session = Session::new(
            request.project_id,
            request.space_id,
            request.configs,
            &*self.clock,
        );
        self.repository.create(&session).await?;
        info!(
            project_id = %session.project_id(),
            session_id = %session.id(),
            "session created"
        );
        Ok(session)
    }

    /// Retrieves a session of the project.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::NotFound`] when the session is not in
    /// the project.
    pub async fn get(
        &self,
        project_id: ProjectId,
        session_id: SessionId,
    ) -> SessionServiceResult<Session> {
        self.repository
            .find(project_id, session_id)
            .await?
            .ok_or(SessionServiceError::NotFound(session_id))
    }

    /// Replaces the configuration of a session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::NotFound`] when the session is not in
    /// the project.
    pub async fn update_configs(
        &self,
        project_id: ProjectId,
        session_id: SessionId,
        configs: Map<String, Value>,
    ) -> SessionServiceResult<Session> {
        let mut session = self.get(project_id, session_id).await?;
        session.update_configs(configs, &*self.clock);
        self.repository.update(&session).await?;
        Ok(session)
    }

    /// Connects a session to a space.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::NotFound`] when the session is not in
    /// the project.
    pub async fn connect_to_space(
        &self,
        project_id: ProjectId,
        session_id: SessionId,
        space_id: SpaceId,
    ) -> SessionServiceResult<Session> {
        let mut session = self.get(project_id, session_id).await?;
        session.connect_to_space(space_id, &*self.clock);
        self.repository.update(&session).await?;
        Ok(session)
    }

    /// Lists one page of the project's sessions.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::Validation`] for a bad limit or a
    /// foreign cursor, and [`SessionServiceError::Repository`] when the
    /// query fails.
    pub async fn list(&self, request: ListSessionsRequest) -> SessionServiceResult<Page<Session>> {
        let limit = self
            .page_limits
            .resolve(request.limit)
            .map_err(ValidationError::from)?;
        let cursor =
            Cursor::decode_optional(request.cursor.as_deref()).map_err(ValidationError::from)?;
        let page_request =
            PageRequest::first(limit, SortDirection::from_time_desc(request.time_desc))
                .after(cursor);

        let rows = self
            .repository
            .list_page(request.project_id, request.filter, &page_request)
            .await?;
        Ok(Page::from_fetched(rows, limit, Session::cursor_key))
    }

    /// Deletes a session with its messages and tasks, then releases the
    /// asset references those messages held.
    ///
    /// An unreadable parts blob only loses the references of its parts;
    /// the blob's own reference is still released.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::NotFound`] when the session is not in
    /// the project, [`SessionServiceError::Repository`] when the delete
    /// fails, and [`SessionServiceError::LeakedReferences`] when the delete
    /// committed but the reference decrement did not.
    pub async fn delete(
        &self,
        project_id: ProjectId,
        session_id: SessionId,
    ) -> SessionServiceResult<()> {
        let parts_assets = self
            .repository
            .delete_cascade(project_id, session_id)
            .await?;

        let released = self.collect_references(parts_assets).await;
        if !released.is_empty() {
            self.references
                .batch_decrement(project_id, &released)
                .await
                .map_err(|source| {
                    error!(
                        %project_id,
                        %session_id,
                        assets = released.len(),
                        error = %source,
                        "session deleted but asset references leaked"
                    );
                    SessionServiceError::LeakedReferences { session_id, source }
                })?;
        }

        info!(
            %project_id,
            %session_id,
            released = released.len(),
            "session deleted"
        );
        Ok(())
    }

    /// Expands parts blob descriptors into every asset they account for.
    async fn collect_references(&self, parts_assets: Vec<Asset>) -> Vec<Asset> {
        let mut blobs: HashMap<String, Vec<Asset>> = HashMap::new();
        let mut released = Vec::with_capacity(parts_assets.len());

        for parts_asset in parts_assets {
            if !blobs.contains_key(&parts_asset.key) {
                let part_assets = self
                    .assets
                    .download_json::<Vec<Part>>(&parts_asset.key)
                    .await
                    .map_or_else(
                        |err| {
                            warn!(
                                key = %parts_asset.key,
                                error = %err,
                                "failed to download parts blob; its attachments stay referenced"
                            );
                            Vec::new()
                        },
                        |parts| parts.into_iter().filter_map(|part| part.asset).collect(),
                    );
                blobs.insert(parts_asset.key.clone(), part_assets);
            }
            if let Some(part_assets) = blobs.get(&parts_asset.key) {
                released.extend(part_assets.iter().cloned());
            }
            released.push(parts_asset);
        }
        released
    }
}
