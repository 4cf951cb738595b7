use std::sync::Arc;

use appflow_db::repositories::Repositories;
use appflow_search::SearchClient;

use crate::config::ServerConfig;
use crate::services::{FlowAppService, FlowService, SearchSync, TechnoService};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// Repository bundle (PostgreSQL in production, in-memory in tests).
    pub repos: Repositories,
    pub apps: Arc<FlowAppService>,
    pub technos: Arc<TechnoService>,
    pub flows: Arc<FlowService>,
    /// Search mirroring, shared with the background reconciler.
    pub search_sync: Arc<SearchSync>,
}

impl AppState {
    /// Wire every service to the given repositories and search client.
    pub fn new(config: ServerConfig, repos: Repositories, search: &dyn SearchClient) -> Self {
        let search_sync = Arc::new(SearchSync::new(repos.clone(), search));
        let technos = Arc::new(TechnoService::new(repos.clone()));
        let apps = Arc::new(FlowAppService::new(repos.clone(), Arc::clone(&search_sync)));
        let flows = Arc::new(FlowService::new(
            repos.clone(),
            Arc::clone(&technos),
            Arc::clone(&search_sync),
        ));

        Self {
            config: Arc::new(config),
            repos,
            apps,
            technos,
            flows,
            search_sync,
        }
    }
}
