//! Repository for the `apps` table.

use appflow_core::types::DbId;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::app::{App, CreateApp, UpdateApp};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Persistence operations for apps.
#[async_trait]
pub trait AppRepository: Send + Sync {
    /// List all apps ordered by ID ascending.
    async fn list(&self) -> Result<Vec<App>, sqlx::Error>;

    /// Find an app by its internal ID.
    async fn find_by_id(&self, id: DbId) -> Result<Option<App>, sqlx::Error>;

    /// Insert a new app, returning the created row.
    async fn create(&self, input: &CreateApp) -> Result<App, sqlx::Error>;

    /// Update an app. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    async fn update(&self, id: DbId, input: &UpdateApp) -> Result<Option<App>, sqlx::Error>;

    /// Delete an app by ID. Returns `true` if a row was removed.
    async fn delete(&self, id: DbId) -> Result<bool, sqlx::Error>;
}

/// PostgreSQL-backed [`AppRepository`].
#[derive(Clone)]
pub struct PgAppRepo {
    pool: PgPool,
}

impl PgAppRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AppRepository for PgAppRepo {
    async fn list(&self) -> Result<Vec<App>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM apps ORDER BY id ASC");
        sqlx::query_as::<_, App>(&query).fetch_all(&self.pool).await
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<App>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM apps WHERE id = $1");
        sqlx::query_as::<_, App>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create(&self, input: &CreateApp) -> Result<App, sqlx::Error> {
        let query = format!(
            "INSERT INTO apps (name, description)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, App>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(&self.pool)
            .await
    }

    async fn update(&self, id: DbId, input: &UpdateApp) -> Result<Option<App>, sqlx::Error> {
        let query = format!(
            "UPDATE apps SET
                name = COALESCE($2, name),
                description = COALESCE($3, description)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, App>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete(&self, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM apps WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
