//! Flow operations: creation with app resolution and technology chaining,
//! partial update with chain replacement, DTO projection.

use std::sync::Arc;

use appflow_core::error::CoreError;
use appflow_core::flow::{validate_chain_length, validate_endpoints};
use appflow_core::search::{object_id, INDEX_FLOWS};
use appflow_core::types::DbId;
use appflow_core::validation::{require_non_blank, validate_input};
use appflow_db::models::app::App;
use appflow_db::models::flow::{
    CreateFlow, FlowChanges, FlowDto, FlowWithRelations, NewFlow, UpdateFlow,
};
use appflow_db::models::techno::CreateTechno;
use appflow_db::repositories::Repositories;

use crate::error::AppResult;
use crate::services::search_sync::{flow_record, SearchHit, SearchSync};
use crate::services::techno::TechnoService;

pub struct FlowService {
    repos: Repositories,
    technos: Arc<TechnoService>,
    sync: Arc<SearchSync>,
}

impl FlowService {
    pub fn new(repos: Repositories, technos: Arc<TechnoService>, sync: Arc<SearchSync>) -> Self {
        Self {
            repos,
            technos,
            sync,
        }
    }

    /// Every flow with both apps and its ordered chain.
    pub async fn get_all(&self) -> AppResult<Vec<FlowWithRelations>> {
        Ok(self.repos.flows.list_with_relations().await?)
    }

    pub async fn get_all_with_dto(&self) -> AppResult<Vec<FlowDto>> {
        Ok(self.get_all().await?.into_iter().map(FlowDto::from).collect())
    }

    pub async fn get_one_with_dto(&self, id: DbId) -> AppResult<Option<FlowDto>> {
        Ok(self
            .repos
            .flows
            .find_with_relations(id)
            .await?
            .map(FlowDto::from))
    }

    /// Free-text search against the `flows` index.
    pub async fn find(&self, query: &str) -> AppResult<Vec<SearchHit>> {
        self.sync.search(INDEX_FLOWS, query).await
    }

    /// Create a flow.
    ///
    /// Both apps are resolved before anything is written, so an unknown app
    /// leaves no flow, order or techno row behind. Technologies are created
    /// or reused in input order and stored at `position = index`.
    pub async fn save_new_flow(&self, input: CreateFlow) -> AppResult<FlowDto> {
        validate_input(&input)?;
        require_non_blank("name", &input.name)?;
        validate_chain(&input.flow_technos)?;
        validate_endpoints(input.source_app_id, input.destination_app_id)?;

        self.resolve_app(input.source_app_id, "Source").await?;
        self.resolve_app(input.destination_app_id, "Destination").await?;

        let techno_ids = self.resolve_technos(&input.flow_technos).await?;
        let new_flow = NewFlow {
            name: input.name,
            description: input.description,
            source_app_id: input.source_app_id,
            dest_app_id: input.destination_app_id,
            techno_ids,
        };
        let flow = self.repos.flows.create(&new_flow).await?;
        self.sync.upsert(INDEX_FLOWS, flow_record(&flow.flow)).await;

        tracing::info!(
            flow_id = flow.flow.id,
            source_app_id = flow.flow.source_app_id,
            dest_app_id = flow.flow.dest_app_id,
            technos = flow.technos.len(),
            "Flow created"
        );
        Ok(FlowDto::from(flow))
    }

    /// Partial update. A present `flow_technos` replaces the whole chain.
    /// `None` when the flow does not exist.
    pub async fn update(&self, id: DbId, input: UpdateFlow) -> AppResult<Option<FlowDto>> {
        validate_input(&input)?;
        if let Some(name) = &input.name {
            require_non_blank("name", name)?;
        }
        if let Some(chain) = &input.flow_technos {
            validate_chain(chain)?;
        }

        let Some(existing) = self.repos.flows.find_with_relations(id).await? else {
            return Ok(None);
        };
        let source_app_id = input.source_app_id.unwrap_or(existing.flow.source_app_id);
        let dest_app_id = input
            .destination_app_id
            .unwrap_or(existing.flow.dest_app_id);
        validate_endpoints(source_app_id, dest_app_id)?;
        if let Some(app_id) = input.source_app_id {
            self.resolve_app(app_id, "Source").await?;
        }
        if let Some(app_id) = input.destination_app_id {
            self.resolve_app(app_id, "Destination").await?;
        }

        let techno_ids = match &input.flow_technos {
            Some(chain) => Some(self.resolve_technos(chain).await?),
            None => None,
        };
        let changes = FlowChanges {
            name: input.name,
            description: input.description,
            source_app_id: input.source_app_id,
            dest_app_id: input.destination_app_id,
            techno_ids,
        };

        let Some(flow) = self.repos.flows.update(id, &changes).await? else {
            return Ok(None);
        };
        self.sync.upsert(INDEX_FLOWS, flow_record(&flow.flow)).await;

        tracing::info!(flow_id = id, technos = flow.technos.len(), "Flow updated");
        Ok(Some(FlowDto::from(flow)))
    }

    /// Delete a flow and its chain. Returns `false` when it does not exist.
    pub async fn delete(&self, id: DbId) -> AppResult<bool> {
        let deleted = self.repos.flows.delete(id).await?;
        if deleted {
            self.sync.remove(INDEX_FLOWS, &object_id(id)).await;
            tracing::info!(flow_id = id, "Flow deleted");
        }
        Ok(deleted)
    }

    async fn resolve_app(&self, id: DbId, role: &str) -> AppResult<App> {
        self.repos
            .apps
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::BadRequest(format!("{role} app {id} does not exist")).into())
    }

    async fn resolve_technos(&self, chain: &[CreateTechno]) -> AppResult<Vec<DbId>> {
        let mut ids = Vec::with_capacity(chain.len());
        for descriptor in chain {
            ids.push(self.technos.save_new_techno(descriptor).await?.id);
        }
        Ok(ids)
    }
}

fn validate_chain(chain: &[CreateTechno]) -> Result<(), CoreError> {
    validate_chain_length(chain.len())?;
    for descriptor in chain {
        require_non_blank("flowTechnos.name", &descriptor.name)?;
    }
    Ok(())
}
