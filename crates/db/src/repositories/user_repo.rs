//! Repository for `users`, `roles` and the `user_roles` junction table.

use appflow_core::types::DbId;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::role::Role;
use crate::models::user::{CreateUser, UserWithRoles};

/// Users joined with an alphabetically sorted array of their role names.
const USER_WITH_ROLES_SELECT: &str = "\
    SELECT u.id, u.username, u.email, u.is_active, u.created_at, u.updated_at, \
           COALESCE(array_agg(r.name ORDER BY r.name) FILTER (WHERE r.name IS NOT NULL), '{}') AS roles \
    FROM users u \
    LEFT JOIN user_roles ur ON ur.user_id = u.id \
    LEFT JOIN roles r ON r.id = ur.role_id";

const ROLE_COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Persistence operations for users and their role grants.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user and its role names.
    async fn find_with_roles(&self, id: DbId) -> Result<Option<UserWithRoles>, sqlx::Error>;

    /// List all users with their role names, ordered by ID.
    async fn list_with_roles(&self) -> Result<Vec<UserWithRoles>, sqlx::Error>;

    /// Insert a user and grant the named roles atomically.
    ///
    /// Role names that do not exist are ignored; callers validate them first.
    async fn create(&self, input: &CreateUser) -> Result<UserWithRoles, sqlx::Error>;

    /// Activate or deactivate a user. Returns `false` if the user does not exist.
    async fn set_active(&self, id: DbId, is_active: bool) -> Result<bool, sqlx::Error>;

    /// List all roles ordered by ID ascending.
    async fn list_roles(&self) -> Result<Vec<Role>, sqlx::Error>;
}

/// PostgreSQL-backed [`UserRepository`].
#[derive(Clone)]
pub struct PgUserRepo {
    pool: PgPool,
}

impl PgUserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepo {
    async fn find_with_roles(&self, id: DbId) -> Result<Option<UserWithRoles>, sqlx::Error> {
        let query = format!("{USER_WITH_ROLES_SELECT} WHERE u.id = $1 GROUP BY u.id");
        sqlx::query_as::<_, UserWithRoles>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_with_roles(&self) -> Result<Vec<UserWithRoles>, sqlx::Error> {
        let query = format!("{USER_WITH_ROLES_SELECT} GROUP BY u.id ORDER BY u.id ASC");
        sqlx::query_as::<_, UserWithRoles>(&query)
            .fetch_all(&self.pool)
            .await
    }

    async fn create(&self, input: &CreateUser) -> Result<UserWithRoles, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let user_id: DbId = sqlx::query_scalar(
            "INSERT INTO users (username, email) VALUES ($1, $2) RETURNING id",
        )
        .bind(&input.username)
        .bind(&input.email)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id)
             SELECT $1, id FROM roles WHERE name = ANY($2)",
        )
        .bind(user_id)
        .bind(&input.roles)
        .execute(&mut *tx)
        .await?;

        let query = format!("{USER_WITH_ROLES_SELECT} WHERE u.id = $1 GROUP BY u.id");
        let created = sqlx::query_as::<_, UserWithRoles>(&query)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn set_active(&self, id: DbId, is_active: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(is_active)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_roles(&self) -> Result<Vec<Role>, sqlx::Error> {
        let query = format!("SELECT {ROLE_COLUMNS} FROM roles ORDER BY id ASC");
        sqlx::query_as::<_, Role>(&query).fetch_all(&self.pool).await
    }
}
