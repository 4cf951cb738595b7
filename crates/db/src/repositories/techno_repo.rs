//! Repository for the `technos` table.

use appflow_core::flow::normalize_techno_name;
use appflow_core::types::DbId;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::techno::{CreateTechno, Techno};

const COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Persistence operations for technologies.
#[async_trait]
pub trait TechnoRepository: Send + Sync {
    /// List all technologies ordered by name.
    async fn list(&self) -> Result<Vec<Techno>, sqlx::Error>;

    /// Find a technology by its internal ID.
    async fn find_by_id(&self, id: DbId) -> Result<Option<Techno>, sqlx::Error>;

    /// Create a technology, or return the existing one with the same
    /// normalized name.
    ///
    /// A provided description overwrites the stored one; an absent one keeps it.
    async fn create_or_get(&self, input: &CreateTechno) -> Result<Techno, sqlx::Error>;
}

/// PostgreSQL-backed [`TechnoRepository`].
#[derive(Clone)]
pub struct PgTechnoRepo {
    pool: PgPool,
}

impl PgTechnoRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TechnoRepository for PgTechnoRepo {
    async fn list(&self) -> Result<Vec<Techno>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM technos ORDER BY name ASC");
        sqlx::query_as::<_, Techno>(&query)
            .fetch_all(&self.pool)
            .await
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Techno>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM technos WHERE id = $1");
        sqlx::query_as::<_, Techno>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_or_get(&self, input: &CreateTechno) -> Result<Techno, sqlx::Error> {
        let name = normalize_techno_name(&input.name);
        let query = format!(
            "INSERT INTO technos (name, description) \
             VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE \
                SET description = COALESCE(EXCLUDED.description, technos.description) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Techno>(&query)
            .bind(&name)
            .bind(&input.description)
            .fetch_one(&self.pool)
            .await
    }
}
