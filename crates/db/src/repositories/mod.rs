//! Repository layer.
//!
//! Each entity has an object-safe async trait and a PostgreSQL
//! implementation holding a cloned `PgPool`. Services depend on the traits
//! only, through the [`Repositories`] bundle.

use std::sync::Arc;

use async_trait::async_trait;

use crate::DbPool;

pub mod app_repo;
pub mod flow_repo;
pub mod search_outbox_repo;
pub mod techno_repo;
pub mod user_repo;

pub use app_repo::{AppRepository, PgAppRepo};
pub use flow_repo::{FlowRepository, PgFlowRepo};
pub use search_outbox_repo::{PgSearchOutboxRepo, SearchOutboxRepository};
pub use techno_repo::{PgTechnoRepo, TechnoRepository};
pub use user_repo::{PgUserRepo, UserRepository};

/// Liveness probe for the backing store.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn ping(&self) -> Result<(), sqlx::Error>;
}

/// [`HealthProbe`] for a PostgreSQL pool.
#[derive(Clone)]
pub struct PgHealthProbe {
    pool: DbPool,
}

#[async_trait]
impl HealthProbe for PgHealthProbe {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        crate::health_check(&self.pool).await
    }
}

/// Every repository the services need, behind trait objects.
///
/// Cheap to clone: each field is an `Arc`.
#[derive(Clone)]
pub struct Repositories {
    pub apps: Arc<dyn AppRepository>,
    pub technos: Arc<dyn TechnoRepository>,
    pub flows: Arc<dyn FlowRepository>,
    pub users: Arc<dyn UserRepository>,
    pub outbox: Arc<dyn SearchOutboxRepository>,
    pub health: Arc<dyn HealthProbe>,
}

impl Repositories {
    /// Wire every repository to the same PostgreSQL pool.
    pub fn postgres(pool: DbPool) -> Self {
        Self {
            apps: Arc::new(PgAppRepo::new(pool.clone())),
            technos: Arc::new(PgTechnoRepo::new(pool.clone())),
            flows: Arc::new(PgFlowRepo::new(pool.clone())),
            users: Arc::new(PgUserRepo::new(pool.clone())),
            outbox: Arc::new(PgSearchOutboxRepo::new(pool.clone())),
            health: Arc::new(PgHealthProbe { pool }),
        }
    }
}
