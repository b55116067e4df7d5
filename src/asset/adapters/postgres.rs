//! `PostgreSQL` reference counter.
//!
//! The increment and decrement helpers take a bare connection so the message
//! repository can apply them inside its own insert transaction.

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;
use std::collections::BTreeMap;
use tracing::error;

use crate::asset::{
    domain::{Asset, AssetReference, reference_counts},
    ports::AssetReferenceRepository,
};
use crate::ids::ProjectId;
use crate::persistence::{
    RepositoryError, RepositoryResult,
    postgres::{PgPool, get_conn, run_blocking, schema::asset_references},
};

/// Insert model for reference counters.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = asset_references)]
struct NewAssetReferenceRow {
    project_id: uuid::Uuid,
    sha256: String,
    ref_count: i64,
}

/// Query result row for reference counters.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = asset_references)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct AssetReferenceRow {
    project_id: uuid::Uuid,
    sha256: String,
    ref_count: i64,
}

impl From<AssetReferenceRow> for AssetReference {
    fn from(row: AssetReferenceRow) -> Self {
        Self {
            project_id: ProjectId::from_uuid(row.project_id),
            sha256: row.sha256,
            ref_count: row.ref_count,
        }
    }
}

/// Adds `counts` to the project's counters, creating missing rows.
pub(crate) fn increment_references(
    conn: &mut PgConnection,
    project_id: ProjectId,
    counts: &BTreeMap<String, i64>,
) -> RepositoryResult<()> {
    if counts.is_empty() {
        return Ok(());
    }

    let rows: Vec<NewAssetReferenceRow> = counts
        .iter()
        .map(|(sha256, delta)| NewAssetReferenceRow {
            project_id: project_id.into_inner(),
            sha256: sha256.clone(),
            ref_count: *delta,
        })
        .collect();

    diesel::insert_into(asset_references::table)
        .values(&rows)
        .on_conflict((asset_references::project_id, asset_references::sha256))
        .do_update()
        .set((
            asset_references::ref_count
                .eq(asset_references::ref_count + excluded(asset_references::ref_count)),
            asset_references::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)?;
    Ok(())
}

/// Subtracts `counts` from the project's counters.
///
/// Each update is guarded by `ref_count >= delta`; a guarded miss is an
/// underflow. Callers run this inside a transaction so a miss rolls back
/// the counters already updated in the batch.
pub(crate) fn decrement_references(
    conn: &mut PgConnection,
    project_id: ProjectId,
    counts: &BTreeMap<String, i64>,
) -> RepositoryResult<()> {
    for (sha256, delta) in counts {
        let guarded = asset_references::table
            .filter(asset_references::project_id.eq(project_id.into_inner()))
            .filter(asset_references::sha256.eq(sha256))
            .filter(asset_references::ref_count.ge(*delta));

        let updated = diesel::update(guarded)
            .set((
                asset_references::ref_count.eq(asset_references::ref_count - *delta),
                asset_references::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)?;

        if updated == 0 {
            let current = asset_references::table
                .filter(asset_references::project_id.eq(project_id.into_inner()))
                .filter(asset_references::sha256.eq(sha256))
                .select(asset_references::ref_count)
                .first::<i64>(conn)
                .optional()?
                .unwrap_or(0);
            error!(
                %project_id,
                sha256 = %sha256,
                current,
                requested = delta,
                "asset reference count underflow"
            );
            return Err(RepositoryError::ReferenceUnderflow {
                project_id,
                sha256: sha256.clone(),
                current,
                requested: *delta,
            });
        }
    }
    Ok(())
}

/// `PostgreSQL`-backed reference counter.
#[derive(Debug, Clone)]
pub struct PostgresAssetReferenceRepository {
    pool: PgPool,
}

impl PostgresAssetReferenceRepository {
    /// Creates a counter from a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssetReferenceRepository for PostgresAssetReferenceRepository {
    async fn batch_increment(
        &self,
        project_id: ProjectId,
        assets: &[Asset],
    ) -> RepositoryResult<()> {
        let pool = self.pool.clone();
        let counts = reference_counts(assets);
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            conn.transaction::<_, RepositoryError, _>(|tx| {
                increment_references(tx, project_id, &counts)
            })
        })
        .await
    }

    async fn batch_decrement(
        &self,
        project_id: ProjectId,
        assets: &[Asset],
    ) -> RepositoryResult<()> {
        let pool = self.pool.clone();
        let counts = reference_counts(assets);
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            conn.transaction::<_, RepositoryError, _>(|tx| {
                decrement_references(tx, project_id, &counts)
            })
        })
        .await
    }

    async fn ref_count(&self, project_id: ProjectId, sha256: &str) -> RepositoryResult<Option<i64>> {
        let pool = self.pool.clone();
        let hash = sha256.to_owned();
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            asset_references::table
                .filter(asset_references::project_id.eq(project_id.into_inner()))
                .filter(asset_references::sha256.eq(hash))
                .select(asset_references::ref_count)
                .first::<i64>(&mut conn)
                .optional()
                .map_err(RepositoryError::from)
        })
        .await
    }

    async fn list_unreferenced(
        &self,
        project_id: ProjectId,
    ) -> RepositoryResult<Vec<AssetReference>> {
        let pool = self.pool.clone();
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            let rows = asset_references::table
                .filter(asset_references::project_id.eq(project_id.into_inner()))
                .filter(asset_references::ref_count.eq(0))
                .order(asset_references::sha256.asc())
                .select(AssetReferenceRow::as_select())
                .load::<AssetReferenceRow>(&mut conn)?;
            Ok(rows.into_iter().map(AssetReference::from).collect())
        })
        .await
    }
}
