//! `PostgreSQL` implementation of the `SessionRepository` port using Diesel ORM.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use serde_json::{Map, Value};

use crate::asset::domain::Asset;
use crate::ids::{ProjectId, SessionId, SpaceId};
use crate::paging::{PageRequest, SortDirection};
use crate::persistence::{
    RepositoryError, RepositoryResult,
    postgres::{
        PgPool, get_conn, run_blocking,
        schema::{messages, sessions},
    },
};
use crate::session::{
    domain::{PersistedSession, Session, SpaceFilter},
    ports::SessionRepository,
};

/// Insert and update model for sessions.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sessions)]
struct SessionRecord {
    id: uuid::Uuid,
    project_id: uuid::Uuid,
    space_id: Option<uuid::Uuid>,
    configs: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Query result row for sessions, in table column order.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct SessionRow {
    id: uuid::Uuid,
    project_id: uuid::Uuid,
    space_id: Option<uuid::Uuid>,
    configs: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&Session> for SessionRecord {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id().into_inner(),
            project_id: session.project_id().into_inner(),
            space_id: session.space_id().map(SpaceId::into_inner),
            configs: Value::Object(session.configs().clone()),
            created_at: session.created_at(),
            updated_at: session.updated_at(),
        }
    }
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        let configs = match row.configs {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::from_persisted(PersistedSession {
            id: SessionId::from_uuid(row.id),
            project_id: ProjectId::from_uuid(row.project_id),
            space_id: row.space_id.map(SpaceId::from_uuid),
            configs,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Builds the keyset query for one page of a project's sessions.
fn session_page_query(
    project_id: ProjectId,
    filter: SpaceFilter,
    request: &PageRequest,
) -> sessions::BoxedQuery<'static, Pg> {
    let mut query = sessions::table
        .filter(sessions::project_id.eq(project_id.into_inner()))
        .into_boxed();

    query = match filter {
        SpaceFilter::Any => query,
        SpaceFilter::Space(space_id) => {
            query.filter(sessions::space_id.eq(space_id.into_inner()))
        }
        SpaceFilter::NotConnected => query.filter(sessions::space_id.is_null()),
    };

    let direction = request.direction();
    if let Some(cursor) = request.cursor() {
        let created_at = cursor.created_at();
        let id = cursor.id();
        query = match direction {
            SortDirection::Ascending => query.filter(
                sessions::created_at
                    .gt(created_at)
                    .or(sessions::created_at.eq(created_at).and(sessions::id.gt(id))),
            ),
            SortDirection::Descending => query.filter(
                sessions::created_at
                    .lt(created_at)
                    .or(sessions::created_at.eq(created_at).and(sessions::id.lt(id))),
            ),
        };
    }

    query = match direction {
        SortDirection::Ascending => {
            query.order((sessions::created_at.asc(), sessions::id.asc()))
        }
        SortDirection::Descending => {
            query.order((sessions::created_at.desc(), sessions::id.desc()))
        }
    };

    query.limit(i64::try_from(request.fetch_limit()).unwrap_or(i64::MAX))
}

/// `PostgreSQL` implementation of [`SessionRepository`].
///
/// Messages and tasks reference sessions with `ON DELETE CASCADE`, so
/// removing the session row removes them in the same transaction.
#[derive(Debug, Clone)]
pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    /// Creates a new repository with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn create(&self, session: &Session) -> RepositoryResult<()> {
        let pool = self.pool.clone();
        let record = SessionRecord::from(session);
        let session_id = session.id();
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            diesel::insert_into(sessions::table)
                .values(&record)
                .execute(&mut conn)
                .map_err(|e| match e {
                    diesel::result::Error::DatabaseError(
                        diesel::result::DatabaseErrorKind::UniqueViolation,
                        _,
                    ) => RepositoryError::duplicate("session", session_id),
                    other => RepositoryError::from(other),
                })?;
            Ok(())
        })
        .await
    }

    async fn find(
        &self,
        project_id: ProjectId,
        session_id: SessionId,
    ) -> RepositoryResult<Option<Session>> {
        let pool = self.pool.clone();
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            let row = sessions::table
                .filter(sessions::id.eq(session_id.into_inner()))
                .filter(sessions::project_id.eq(project_id.into_inner()))
                .select(SessionRow::as_select())
                .first::<SessionRow>(&mut conn)
                .optional()?;
            Ok(row.map(Session::from))
        })
        .await
    }

    async fn update(&self, session: &Session) -> RepositoryResult<()> {
        let pool = self.pool.clone();
        let record = SessionRecord::from(session);
        let session_id = session.id();
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            let target = sessions::table
                .filter(sessions::id.eq(record.id))
                .filter(sessions::project_id.eq(record.project_id));
            let updated = diesel::update(target)
                .set((
                    sessions::space_id.eq(record.space_id),
                    sessions::configs.eq(&record.configs),
                    sessions::updated_at.eq(record.updated_at),
                ))
                .execute(&mut conn)?;
            if updated == 0 {
                return Err(RepositoryError::SessionNotFound(session_id));
            }
            Ok(())
        })
        .await
    }

    async fn list_page(
        &self,
        project_id: ProjectId,
        filter: SpaceFilter,
        request: &PageRequest,
    ) -> RepositoryResult<Vec<Session>> {
        let pool = self.pool.clone();
        let query_request = *request;
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            let rows = session_page_query(project_id, filter, &query_request)
                .load::<SessionRow>(&mut conn)?;
            Ok(rows.into_iter().map(Session::from).collect())
        })
        .await
    }

    async fn delete_cascade(
        &self,
        project_id: ProjectId,
        session_id: SessionId,
    ) -> RepositoryResult<Vec<Asset>> {
        let pool = self.pool.clone();
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let locked = sessions::table
                    .filter(sessions::id.eq(session_id.into_inner()))
                    .filter(sessions::project_id.eq(project_id.into_inner()))
                    .select(sessions::id)
                    .for_update()
                    .first::<uuid::Uuid>(tx)
                    .optional()?;
                if locked.is_none() {
                    return Err(RepositoryError::SessionNotFound(session_id));
                }

                let descriptors = messages::table
                    .filter(messages::session_id.eq(session_id.into_inner()))
                    .select(messages::parts_asset)
                    .load::<Value>(tx)?;

                diesel::delete(sessions::table.filter(sessions::id.eq(session_id.into_inner())))
                    .execute(tx)?;

                descriptors
                    .into_iter()
                    .map(|value| serde_json::from_value::<Asset>(value).map_err(RepositoryError::from))
                    .collect()
            })
        })
        .await
    }
}
