//! Flow, flow-technology ordering, and the flow DTOs.

use appflow_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::app::App;
use crate::models::techno::{CreateTechno, Techno};

// ---------------------------------------------------------------------------
// Entity structs (database rows)
// ---------------------------------------------------------------------------

/// A row from the `flows` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub source_app_id: DbId,
    pub dest_app_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `flow_techno_orders` junction table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowTechnoOrder {
    pub id: DbId,
    pub flow_id: DbId,
    pub techno_id: DbId,
    pub position: i32,
}

/// One step of a flow chain: the order row's position joined with its techno.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowTechnoStep {
    pub position: i32,
    pub techno: Techno,
}

/// A flow loaded together with both endpoint apps and its technology chain.
///
/// `technos` is sorted by position.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowWithRelations {
    pub flow: Flow,
    pub source_app: App,
    pub dest_app: App,
    pub technos: Vec<FlowTechnoStep>,
}

// ---------------------------------------------------------------------------
// Output DTO
// ---------------------------------------------------------------------------

/// Flow as returned by the API.
///
/// Order rows are unwrapped to bare technos; their position only survives
/// as the order of `flow_technos`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDto {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub source_app: App,
    pub destination_app: App,
    pub flow_technos: Vec<Techno>,
}

impl From<FlowWithRelations> for FlowDto {
    fn from(value: FlowWithRelations) -> Self {
        let mut steps = value.technos;
        steps.sort_by_key(|s| s.position);
        Self {
            id: value.flow.id,
            name: value.flow.name,
            description: value.flow.description,
            source_app: value.source_app,
            destination_app: value.dest_app,
            flow_technos: steps.into_iter().map(|s| s.techno).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// DTOs (request payloads)
// ---------------------------------------------------------------------------

/// DTO for creating a flow.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFlow {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub source_app_id: DbId,
    pub destination_app_id: DbId,
    /// Technology descriptors in chain order. Each is created or reused by name.
    #[serde(default)]
    #[validate(nested)]
    pub flow_technos: Vec<CreateTechno>,
}

/// DTO for updating a flow.
///
/// Absent fields keep their value. A present `flow_technos` replaces the
/// whole chain.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFlow {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub source_app_id: Option<DbId>,
    pub destination_app_id: Option<DbId>,
    #[validate(nested)]
    pub flow_technos: Option<Vec<CreateTechno>>,
}

// ---------------------------------------------------------------------------
// Repository inputs (references already resolved)
// ---------------------------------------------------------------------------

/// Insert payload for a flow whose apps and technos have been resolved.
///
/// `techno_ids` is in chain order; index `i` is stored at position `i`.
#[derive(Debug, Clone)]
pub struct NewFlow {
    pub name: String,
    pub description: Option<String>,
    pub source_app_id: DbId,
    pub dest_app_id: DbId,
    pub techno_ids: Vec<DbId>,
}

/// Patch payload for a flow. `techno_ids`, when present, replaces the chain.
#[derive(Debug, Clone, Default)]
pub struct FlowChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub source_app_id: Option<DbId>,
    pub dest_app_id: Option<DbId>,
    pub techno_ids: Option<Vec<DbId>>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn app(id: DbId, name: &str) -> App {
        App {
            id,
            name: name.to_string(),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn step(position: i32, id: DbId, name: &str) -> FlowTechnoStep {
        FlowTechnoStep {
            position,
            techno: Techno {
                id,
                name: name.to_string(),
                description: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        }
    }

    #[test]
    fn dto_unwraps_technos_in_position_order() {
        let now = Utc::now();
        let loaded = FlowWithRelations {
            flow: Flow {
                id: 5,
                name: "Sync".into(),
                description: None,
                source_app_id: 1,
                dest_app_id: 2,
                created_at: now,
                updated_at: now,
            },
            source_app: app(1, "CRM"),
            dest_app: app(2, "ESB"),
            technos: vec![step(1, 20, "SFTP"), step(0, 10, "Kafka")],
        };

        let dto = FlowDto::from(loaded);
        assert_eq!(dto.source_app.name, "CRM");
        assert_eq!(dto.destination_app.name, "ESB");
        let names: Vec<&str> = dto.flow_technos.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Kafka", "SFTP"]);
    }

    #[test]
    fn create_flow_reads_camel_case_payload() {
        let input: CreateFlow = serde_json::from_value(serde_json::json!({
            "name": "Sync",
            "sourceAppId": 1,
            "destinationAppId": 2,
            "flowTechnos": [{"name": "Kafka"}]
        }))
        .unwrap();
        assert_eq!(input.destination_app_id, 2);
        assert_eq!(input.flow_technos.len(), 1);
        assert!(input.description.is_none());
    }
}
