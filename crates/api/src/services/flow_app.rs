//! App catalog operations.

use std::sync::Arc;

use appflow_core::error::CoreError;
use appflow_core::search::{object_id, INDEX_APPS};
use appflow_core::types::DbId;
use appflow_core::validation::{require_non_blank, validate_input};
use appflow_db::models::app::{App, CreateApp, UpdateApp};
use appflow_db::repositories::Repositories;

use crate::error::AppResult;
use crate::services::search_sync::{app_record, SearchHit, SearchSync};

pub struct FlowAppService {
    repos: Repositories,
    sync: Arc<SearchSync>,
}

impl FlowAppService {
    pub fn new(repos: Repositories, sync: Arc<SearchSync>) -> Self {
        Self { repos, sync }
    }

    /// Every app, ordered by id.
    pub async fn get_all(&self) -> AppResult<Vec<App>> {
        Ok(self.repos.apps.list().await?)
    }

    /// Absence is returned to the caller, which decides between 404 and 400.
    pub async fn get_one_by_id(&self, id: DbId) -> AppResult<Option<App>> {
        Ok(self.repos.apps.find_by_id(id).await?)
    }

    /// Free-text search against the `apps` index. No fallback to the
    /// relational store when the provider is down.
    pub async fn find(&self, query: &str) -> AppResult<Vec<SearchHit>> {
        self.sync.search(INDEX_APPS, query).await
    }

    /// Persist a new app, then mirror it into the index.
    pub async fn save_new_app(&self, input: CreateApp) -> AppResult<App> {
        validate_input(&input)?;
        require_non_blank("name", &input.name)?;

        let app = self.repos.apps.create(&input).await?;
        self.sync.upsert(INDEX_APPS, app_record(&app)).await;

        tracing::info!(app_id = app.id, name = %app.name, "App created");
        Ok(app)
    }

    /// Partial update. `None` when the app does not exist.
    pub async fn update(&self, id: DbId, input: UpdateApp) -> AppResult<Option<App>> {
        validate_input(&input)?;
        if let Some(name) = &input.name {
            require_non_blank("name", name)?;
        }

        let Some(app) = self.repos.apps.update(id, &input).await? else {
            return Ok(None);
        };
        self.sync.upsert(INDEX_APPS, app_record(&app)).await;

        tracing::info!(app_id = app.id, "App updated");
        Ok(Some(app))
    }

    /// Delete an app no flow references. Returns `false` when it does not exist.
    pub async fn delete(&self, id: DbId) -> AppResult<bool> {
        if self.repos.apps.find_by_id(id).await?.is_none() {
            return Ok(false);
        }
        let flows = self.repos.flows.count_by_app(id).await?;
        if flows > 0 {
            return Err(CoreError::Conflict(format!(
                "App {id} is referenced by {flows} flow(s)"
            ))
            .into());
        }

        let deleted = self.repos.apps.delete(id).await?;
        if deleted {
            self.sync.remove(INDEX_APPS, &object_id(id)).await;
            tracing::info!(app_id = id, "App deleted");
        }
        Ok(deleted)
    }
}
