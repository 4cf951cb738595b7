//! Repository for the `flows` table and its `flow_techno_orders` chain.
//!
//! A flow and its chain are always written in one transaction, so readers
//! never observe a flow with a partial chain.

use std::collections::HashMap;

use appflow_core::flow::assign_positions;
use appflow_core::types::{DbId, Timestamp};
use async_trait::async_trait;
use sqlx::{FromRow, PgConnection, PgPool};

use crate::models::app::App;
use crate::models::flow::{Flow, FlowChanges, FlowTechnoStep, FlowWithRelations, NewFlow};
use crate::models::techno::Techno;

const COLUMNS: &str = "id, name, description, source_app_id, dest_app_id, created_at, updated_at";

const APP_COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Persistence operations for flows.
#[async_trait]
pub trait FlowRepository: Send + Sync {
    /// Load every flow with its apps and ordered chain, ordered by flow ID.
    async fn list_with_relations(&self) -> Result<Vec<FlowWithRelations>, sqlx::Error>;

    /// Load one flow with its apps and ordered chain.
    async fn find_with_relations(&self, id: DbId)
        -> Result<Option<FlowWithRelations>, sqlx::Error>;

    /// Insert a flow and its chain atomically.
    async fn create(&self, input: &NewFlow) -> Result<FlowWithRelations, sqlx::Error>;

    /// Patch a flow, replacing the chain when `changes.techno_ids` is set.
    ///
    /// Returns `None` if no row with the given `id` exists.
    async fn update(
        &self,
        id: DbId,
        changes: &FlowChanges,
    ) -> Result<Option<FlowWithRelations>, sqlx::Error>;

    /// Delete a flow and, by cascade, its chain. Returns `true` if a row was removed.
    async fn delete(&self, id: DbId) -> Result<bool, sqlx::Error>;

    /// Count flows that use the app as source or destination.
    async fn count_by_app(&self, app_id: DbId) -> Result<i64, sqlx::Error>;
}

/// PostgreSQL-backed [`FlowRepository`].
#[derive(Clone)]
pub struct PgFlowRepo {
    pool: PgPool,
}

impl PgFlowRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load apps and chains for the given flow rows and stitch them together.
    async fn load_relations(&self, flows: Vec<Flow>) -> Result<Vec<FlowWithRelations>, sqlx::Error> {
        if flows.is_empty() {
            return Ok(Vec::new());
        }

        let flow_ids: Vec<DbId> = flows.iter().map(|f| f.id).collect();
        let mut app_ids: Vec<DbId> = flows
            .iter()
            .flat_map(|f| [f.source_app_id, f.dest_app_id])
            .collect();
        app_ids.sort_unstable();
        app_ids.dedup();

        let query = format!("SELECT {APP_COLUMNS} FROM apps WHERE id = ANY($1)");
        let apps: HashMap<DbId, App> = sqlx::query_as::<_, App>(&query)
            .bind(&app_ids)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        let steps = sqlx::query_as::<_, StepRow>(
            "SELECT o.flow_id, o.position, t.id, t.name, t.description, t.created_at, t.updated_at
             FROM flow_techno_orders o
             JOIN technos t ON t.id = o.techno_id
             WHERE o.flow_id = ANY($1)
             ORDER BY o.flow_id, o.position",
        )
        .bind(&flow_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut chains: HashMap<DbId, Vec<FlowTechnoStep>> = HashMap::new();
        for row in steps {
            let (flow_id, step) = row.into_step();
            chains.entry(flow_id).or_default().push(step);
        }

        flows
            .into_iter()
            .map(|flow| {
                let source_app = apps
                    .get(&flow.source_app_id)
                    .cloned()
                    .ok_or(sqlx::Error::RowNotFound)?;
                let dest_app = apps
                    .get(&flow.dest_app_id)
                    .cloned()
                    .ok_or(sqlx::Error::RowNotFound)?;
                let technos = chains.remove(&flow.id).unwrap_or_default();
                Ok(FlowWithRelations {
                    flow,
                    source_app,
                    dest_app,
                    technos,
                })
            })
            .collect()
    }
}

/// Join row of `flow_techno_orders` and `technos`.
#[derive(FromRow)]
struct StepRow {
    flow_id: DbId,
    position: i32,
    id: DbId,
    name: String,
    description: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl StepRow {
    fn into_step(self) -> (DbId, FlowTechnoStep) {
        (
            self.flow_id,
            FlowTechnoStep {
                position: self.position,
                techno: Techno {
                    id: self.id,
                    name: self.name,
                    description: self.description,
                    created_at: self.created_at,
                    updated_at: self.updated_at,
                },
            },
        )
    }
}

/// Write `techno_ids` as the chain of `flow_id`, position = index.
async fn insert_chain(
    conn: &mut PgConnection,
    flow_id: DbId,
    techno_ids: &[DbId],
) -> Result<(), sqlx::Error> {
    if techno_ids.is_empty() {
        return Ok(());
    }
    let (positions, ids): (Vec<i32>, Vec<DbId>) =
        assign_positions(techno_ids.to_vec()).into_iter().unzip();
    sqlx::query(
        "INSERT INTO flow_techno_orders (flow_id, techno_id, position)
         SELECT $1, chain.techno_id, chain.position
         FROM UNNEST($2::BIGINT[], $3::INTEGER[]) AS chain(techno_id, position)",
    )
    .bind(flow_id)
    .bind(&ids)
    .bind(&positions)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl FlowRepository for PgFlowRepo {
    async fn list_with_relations(&self) -> Result<Vec<FlowWithRelations>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM flows ORDER BY id ASC");
        let flows = sqlx::query_as::<_, Flow>(&query)
            .fetch_all(&self.pool)
            .await?;
        self.load_relations(flows).await
    }

    async fn find_with_relations(
        &self,
        id: DbId,
    ) -> Result<Option<FlowWithRelations>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM flows WHERE id = $1");
        let Some(flow) = sqlx::query_as::<_, Flow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        Ok(self.load_relations(vec![flow]).await?.pop())
    }

    async fn create(&self, input: &NewFlow) -> Result<FlowWithRelations, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            "INSERT INTO flows (name, description, source_app_id, dest_app_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let flow = sqlx::query_as::<_, Flow>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.source_app_id)
            .bind(input.dest_app_id)
            .fetch_one(&mut *tx)
            .await?;

        insert_chain(&mut *tx, flow.id, &input.techno_ids).await?;
        tx.commit().await?;

        self.load_relations(vec![flow])
            .await?
            .pop()
            .ok_or(sqlx::Error::RowNotFound)
    }

    async fn update(
        &self,
        id: DbId,
        changes: &FlowChanges,
    ) -> Result<Option<FlowWithRelations>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            "UPDATE flows SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                source_app_id = COALESCE($4, source_app_id),
                dest_app_id = COALESCE($5, dest_app_id)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let Some(flow) = sqlx::query_as::<_, Flow>(&query)
            .bind(id)
            .bind(&changes.name)
            .bind(&changes.description)
            .bind(changes.source_app_id)
            .bind(changes.dest_app_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        if let Some(techno_ids) = &changes.techno_ids {
            sqlx::query("DELETE FROM flow_techno_orders WHERE flow_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_chain(&mut *tx, id, techno_ids).await?;
        }
        tx.commit().await?;

        Ok(self.load_relations(vec![flow]).await?.pop())
    }

    async fn delete(&self, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM flows WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_by_app(&self, app_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM flows WHERE source_app_id = $1 OR dest_app_id = $1",
        )
        .bind(app_id)
        .fetch_one(&self.pool)
        .await
    }
}
