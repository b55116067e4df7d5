//! `PostgreSQL` implementation of the `MessageRepository` port using Diesel ORM.
//!
//! Message rows store the parts blob descriptor and metadata as JSONB. The
//! insert, the parent lookup, and the reference-count increment share one
//! transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;

use crate::asset::{
    adapters::postgres::increment_references,
    domain::{Asset, reference_counts},
};
use crate::ids::{MessageId, ProjectId, SessionId};
use crate::message::{
    domain::{Message, PersistedMessage, ProcessingStatus, Role},
    error::ValidationError,
    ports::repository::MessageRepository,
};
use crate::paging::{PageRequest, SortDirection};
use crate::persistence::{
    RepositoryError, RepositoryResult,
    postgres::{
        PgPool, get_conn, run_blocking,
        schema::{messages, sessions},
    },
};

/// Insert model for messages.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = messages)]
struct NewMessageRow {
    id: uuid::Uuid,
    session_id: uuid::Uuid,
    parent_id: Option<uuid::Uuid>,
    role: String,
    meta: Option<serde_json::Value>,
    parts_asset: serde_json::Value,
    created_at: DateTime<Utc>,
    processing_status: String,
}

/// Query result row for messages, in table column order.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct MessageRow {
    id: uuid::Uuid,
    session_id: uuid::Uuid,
    parent_id: Option<uuid::Uuid>,
    role: String,
    meta: Option<serde_json::Value>,
    parts_asset: serde_json::Value,
    created_at: DateTime<Utc>,
    processing_status: String,
}

impl NewMessageRow {
    fn from_message(message: &Message) -> RepositoryResult<Self> {
        let meta = message
            .meta()
            .map(|map| serde_json::Value::Object(map.clone()));
        Ok(Self {
            id: message.id().into_inner(),
            session_id: message.session_id().into_inner(),
            parent_id: message.parent_id().map(MessageId::into_inner),
            role: message.role().as_str().to_owned(),
            meta,
            parts_asset: serde_json::to_value(message.parts_asset())?,
            created_at: message.created_at(),
            processing_status: message.processing_status().as_str().to_owned(),
        })
    }
}

impl TryFrom<MessageRow> for Message {
    type Error = RepositoryError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e: ValidationError| RepositoryError::serialization(e.to_string()))?;
        let processing_status = ProcessingStatus::try_from(row.processing_status.as_str())
            .map_err(|e| RepositoryError::serialization(e.to_string()))?;
        let meta = match row.meta {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::Object(map)) => Some(map),
            Some(other) => {
                return Err(RepositoryError::serialization(format!(
                    "message meta must be an object, found {other}"
                )));
            }
        };

        Ok(Self::from_persisted(PersistedMessage {
            id: MessageId::from_uuid(row.id),
            session_id: SessionId::from_uuid(row.session_id),
            role,
            parts_asset: serde_json::from_value(row.parts_asset)?,
            meta,
            parent_id: row.parent_id.map(MessageId::from_uuid),
            processing_status,
            created_at: row.created_at,
        }))
    }
}

/// Builds the keyset query for one page of a session's messages.
///
/// Rows strictly after the cursor in `(created_at, id)` order are selected,
/// ordered in the request direction, and capped at the fetch limit.
fn message_page_query(
    session_id: SessionId,
    request: &PageRequest,
) -> messages::BoxedQuery<'static, Pg> {
    let mut query = messages::table
        .filter(messages::session_id.eq(session_id.into_inner()))
        .into_boxed();

    let direction = request.direction();
    if let Some(cursor) = request.cursor() {
        let created_at = cursor.created_at();
        let id = cursor.id();
        query = match direction {
            SortDirection::Ascending => query.filter(
                messages::created_at
                    .gt(created_at)
                    .or(messages::created_at.eq(created_at).and(messages::id.gt(id))),
            ),
            SortDirection::Descending => query.filter(
                messages::created_at
                    .lt(created_at)
                    .or(messages::created_at.eq(created_at).and(messages::id.lt(id))),
            ),
        };
    }

    query = match direction {
        SortDirection::Ascending => {
            query.order((messages::created_at.asc(), messages::id.asc()))
        }
        SortDirection::Descending => {
            query.order((messages::created_at.desc(), messages::id.desc()))
        }
    };

    query.limit(i64::try_from(request.fetch_limit()).unwrap_or(i64::MAX))
}

/// `PostgreSQL` implementation of [`MessageRepository`].
///
/// Uses Diesel ORM with connection pooling via r2d2. Thread-safe for
/// concurrent access.
///
/// # Example
///
/// ```ignore
/// use colloquy::message::adapters::postgres::PostgresMessageRepository;
/// use colloquy::persistence::postgres::build_pool;
///
/// let pool = build_pool("postgres://...", 8).expect("pool");
/// let repo = PostgresMessageRepository::new(pool);
/// ```
#[derive(Debug, Clone)]
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    /// Creates a new repository with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn session_owned(
    conn: &mut PgConnection,
    project_id: ProjectId,
    session_id: SessionId,
) -> RepositoryResult<bool> {
    let count: i64 = sessions::table
        .filter(sessions::id.eq(session_id.into_inner()))
        .filter(sessions::project_id.eq(project_id.into_inner()))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn session_exists(
        &self,
        project_id: ProjectId,
        session_id: SessionId,
    ) -> RepositoryResult<bool> {
        let pool = self.pool.clone();
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            session_owned(&mut conn, project_id, session_id)
        })
        .await
    }

    async fn create(
        &self,
        project_id: ProjectId,
        message: &Message,
        referenced: &[Asset],
    ) -> RepositoryResult<Message> {
        let pool = self.pool.clone();
        let pending = message.clone();
        let counts = reference_counts(referenced);
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let session_id = pending.session_id();
                // Lock the session row so concurrent inserts agree on the parent.
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

                let parent_id = messages::table
                    .filter(messages::session_id.eq(session_id.into_inner()))
                    .order((messages::created_at.desc(), messages::id.desc()))
                    .select(messages::id)
                    .first::<uuid::Uuid>(tx)
                    .optional()?
                    .map(MessageId::from_uuid);

                let stored = pending.with_parent(parent_id);
                let row = NewMessageRow::from_message(&stored)?;
                diesel::insert_into(messages::table)
                    .values(&row)
                    .execute(tx)
                    .map_err(|e| match e {
                        diesel::result::Error::DatabaseError(
                            diesel::result::DatabaseErrorKind::UniqueViolation,
                            _,
                        ) => RepositoryError::duplicate("message", stored.id()),
                        other => RepositoryError::from(other),
                    })?;

                increment_references(tx, project_id, &counts)?;
                Ok(stored)
            })
        })
        .await
    }

    async fn list_page(
        &self,
        session_id: SessionId,
        request: &PageRequest,
    ) -> RepositoryResult<Vec<Message>> {
        let pool = self.pool.clone();
        let query_request = *request;
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            let rows = message_page_query(session_id, &query_request).load::<MessageRow>(&mut conn)?;
            rows.into_iter().map(Message::try_from).collect()
        })
        .await
    }

    async fn find_by_id(&self, id: MessageId) -> RepositoryResult<Option<Message>> {
        let pool = self.pool.clone();
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            messages::table
                .filter(messages::id.eq(id.into_inner()))
                .select(MessageRow::as_select())
                .first::<MessageRow>(&mut conn)
                .optional()?
                .map(Message::try_from)
                .transpose()
        })
        .await
    }

    async fn claim_pending(&self, session_id: SessionId) -> RepositoryResult<Vec<Message>> {
        let pool = self.pool.clone();
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            // Concurrent claims block on the row locks and then skip rows
            // that are no longer pending.
            let rows = diesel::update(
                messages::table
                    .filter(messages::session_id.eq(session_id.into_inner()))
                    .filter(messages::processing_status.eq(ProcessingStatus::Pending.as_str())),
            )
            .set(messages::processing_status.eq(ProcessingStatus::Running.as_str()))
            .returning(MessageRow::as_returning())
            .get_results::<MessageRow>(&mut conn)?;
            let mut claimed = rows
                .into_iter()
                .map(Message::try_from)
                .collect::<RepositoryResult<Vec<_>>>()?;
            claimed.sort_by_key(Message::cursor_key);
            Ok(claimed)
        })
        .await
    }

    async fn release_to_pending(&self, ids: &[MessageId]) -> RepositoryResult<usize> {
        let pool = self.pool.clone();
        let targets: Vec<uuid::Uuid> = ids.iter().copied().map(MessageId::into_inner).collect();
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            let released = diesel::update(
                messages::table
                    .filter(messages::id.eq_any(targets))
                    .filter(messages::processing_status.eq(ProcessingStatus::Running.as_str())),
            )
            .set(messages::processing_status.eq(ProcessingStatus::Pending.as_str()))
            .execute(&mut conn)?;
            Ok(released)
        })
        .await
    }
}
