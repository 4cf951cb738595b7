//! Repository for the `search_outbox` table.

use appflow_core::types::DbId;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::search_outbox::{SearchOperation, SearchOutboxEntry};

const COLUMNS: &str = "id, index_name, object_id, operation, revision, attempts, last_error, \
                       claimed_until, created_at, updated_at";

/// Persistence operations for pending index writes.
#[async_trait]
pub trait SearchOutboxRepository: Send + Sync {
    /// Record that `object_id` in `index_name` needs `operation` replayed.
    ///
    /// There is at most one pending entry per object: enqueueing again
    /// replaces the operation, bumps `revision`, resets the attempt counter
    /// and releases any claim.
    async fn enqueue(
        &self,
        index_name: &str,
        object_id: &str,
        operation: SearchOperation,
    ) -> Result<SearchOutboxEntry, sqlx::Error>;

    /// Pending entries, fewest attempts first, then oldest.
    async fn list_pending(&self, limit: i64) -> Result<Vec<SearchOutboxEntry>, sqlx::Error>;

    /// Lease up to `limit` unclaimed entries for `lease_secs`, in
    /// [`list_pending`](Self::list_pending) order. Entries leased by another
    /// reconciler are skipped.
    async fn claim_pending(
        &self,
        limit: i64,
        lease_secs: i64,
    ) -> Result<Vec<SearchOutboxEntry>, sqlx::Error>;

    /// Bump the attempt counter, store the latest failure and release the claim.
    async fn record_failure(&self, id: DbId, error: &str) -> Result<(), sqlx::Error>;

    /// Remove a replayed entry if it is still at `revision`.
    ///
    /// Returns `false` when the entry is gone or was re-enqueued after it was
    /// read; a re-enqueued entry stays pending.
    async fn complete(&self, id: DbId, revision: i32) -> Result<bool, sqlx::Error>;

    /// Number of pending entries.
    async fn count(&self) -> Result<i64, sqlx::Error>;
}

/// PostgreSQL-backed [`SearchOutboxRepository`].
#[derive(Clone)]
pub struct PgSearchOutboxRepo {
    pool: PgPool,
}

impl PgSearchOutboxRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SearchOutboxRepository for PgSearchOutboxRepo {
    async fn enqueue(
        &self,
        index_name: &str,
        object_id: &str,
        operation: SearchOperation,
    ) -> Result<SearchOutboxEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO search_outbox (index_name, object_id, operation)
             VALUES ($1, $2, $3)
             ON CONFLICT (index_name, object_id) DO UPDATE SET
                operation = EXCLUDED.operation,
                revision = search_outbox.revision + 1,
                attempts = 0,
                last_error = NULL,
                claimed_until = NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SearchOutboxEntry>(&query)
            .bind(index_name)
            .bind(object_id)
            .bind(operation.as_str())
            .fetch_one(&self.pool)
            .await
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<SearchOutboxEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM search_outbox ORDER BY attempts ASC, id ASC LIMIT $1"
        );
        sqlx::query_as::<_, SearchOutboxEntry>(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    async fn claim_pending(
        &self,
        limit: i64,
        lease_secs: i64,
    ) -> Result<Vec<SearchOutboxEntry>, sqlx::Error> {
        let query = format!(
            "UPDATE search_outbox
             SET claimed_until = NOW() + $2::float8 * INTERVAL '1 second'
             WHERE id IN (
                SELECT id FROM search_outbox
                WHERE claimed_until IS NULL OR claimed_until < NOW()
                ORDER BY attempts ASC, id ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
             )
             RETURNING {COLUMNS}"
        );
        let mut entries = sqlx::query_as::<_, SearchOutboxEntry>(&query)
            .bind(limit)
            .bind(lease_secs)
            .fetch_all(&self.pool)
            .await?;
        // RETURNING does not preserve the subquery order.
        entries.sort_by_key(|e| (e.attempts, e.id));
        Ok(entries)
    }

    async fn record_failure(&self, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE search_outbox \
             SET attempts = attempts + 1, last_error = $2, claimed_until = NULL \
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn complete(&self, id: DbId, revision: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM search_outbox WHERE id = $1 AND revision = $2")
            .bind(id)
            .bind(revision)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM search_outbox")
            .fetch_one(&self.pool)
            .await
    }
}
