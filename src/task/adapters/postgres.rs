//! `PostgreSQL` task repository backed by Diesel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde_json::Value;

use crate::ids::{ProjectId, SessionId};
use crate::paging::{PageRequest, SortDirection};
use crate::persistence::{
    RepositoryError, RepositoryResult,
    postgres::{PgPool, get_conn, run_blocking, schema::tasks},
};
use crate::task::{
    domain::{PersistedTaskData, Task, TaskId, TaskStatus},
    ports::TaskRepository,
};

/// Insert model for tasks.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
struct NewTaskRow {
    id: uuid::Uuid,
    session_id: uuid::Uuid,
    project_id: uuid::Uuid,
    task_order: i32,
    status: String,
    data: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Query result row for tasks, in table column order.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct TaskRow {
    id: uuid::Uuid,
    session_id: uuid::Uuid,
    project_id: uuid::Uuid,
    task_order: i32,
    status: String,
    data: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&Task> for NewTaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id().into_inner(),
            session_id: task.session_id().into_inner(),
            project_id: task.project_id().into_inner(),
            task_order: task.order(),
            status: task.status().as_str().to_owned(),
            data: task.data().clone(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

impl TryFrom<TaskRow> for Task {
    type Error = RepositoryError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status = TaskStatus::try_from(row.status.as_str())
            .map_err(|e| RepositoryError::serialization(e.to_string()))?;
        Ok(Self::from_persisted(PersistedTaskData {
            id: TaskId::from_uuid(row.id),
            session_id: SessionId::from_uuid(row.session_id),
            project_id: ProjectId::from_uuid(row.project_id),
            order: row.task_order,
            status,
            data: row.data,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }
}

/// Builds the keyset query for one page of a session's tasks.
fn task_page_query(session_id: SessionId, request: &PageRequest) -> tasks::BoxedQuery<'static, Pg> {
    let mut query = tasks::table
        .filter(tasks::session_id.eq(session_id.into_inner()))
        .into_boxed();

    let direction = request.direction();
    if let Some(cursor) = request.cursor() {
        let created_at = cursor.created_at();
        let id = cursor.id();
        query = match direction {
            SortDirection::Ascending => query.filter(
                tasks::created_at
                    .gt(created_at)
                    .or(tasks::created_at.eq(created_at).and(tasks::id.gt(id))),
            ),
            SortDirection::Descending => query.filter(
                tasks::created_at
                    .lt(created_at)
                    .or(tasks::created_at.eq(created_at).and(tasks::id.lt(id))),
            ),
        };
    }

    query = match direction {
        SortDirection::Ascending => query.order((tasks::created_at.asc(), tasks::id.asc())),
        SortDirection::Descending => query.order((tasks::created_at.desc(), tasks::id.desc())),
    };

    query.limit(i64::try_from(request.fetch_limit()).unwrap_or(i64::MAX))
}

/// `PostgreSQL` implementation of [`TaskRepository`].
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    /// Creates a new repository with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn store(&self, task: &Task) -> RepositoryResult<()> {
        let pool = self.pool.clone();
        let row = NewTaskRow::from(task);
        let task_id = task.id();
        let session_id = task.session_id();
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            diesel::insert_into(tasks::table)
                .values(&row)
                .execute(&mut conn)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        RepositoryError::duplicate("task", task_id)
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                        RepositoryError::SessionNotFound(session_id)
                    }
                    other => RepositoryError::from(other),
                })?;
            Ok(())
        })
        .await
    }

    async fn update_status(&self, task: &Task) -> RepositoryResult<()> {
        let pool = self.pool.clone();
        let task_id = task.id();
        let status = task.status().as_str().to_owned();
        let updated_at = task.updated_at();
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            let updated = diesel::update(tasks::table.filter(tasks::id.eq(task_id.into_inner())))
                .set((tasks::status.eq(status), tasks::updated_at.eq(updated_at)))
                .execute(&mut conn)?;
            if updated == 0 {
                return Err(RepositoryError::not_found("task", task_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: TaskId) -> RepositoryResult<Option<Task>> {
        let pool = self.pool.clone();
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            tasks::table
                .filter(tasks::id.eq(id.into_inner()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(&mut conn)
                .optional()?
                .map(Task::try_from)
                .transpose()
        })
        .await
    }

    async fn list_by_session(
        &self,
        session_id: SessionId,
        request: &PageRequest,
    ) -> RepositoryResult<Vec<Task>> {
        let pool = self.pool.clone();
        let query_request = *request;
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            let rows = task_page_query(session_id, &query_request).load::<TaskRow>(&mut conn)?;
            rows.into_iter().map(Task::try_from).collect()
        })
        .await
    }
}
