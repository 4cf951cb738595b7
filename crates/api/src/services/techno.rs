//! Technology catalog operations.

use appflow_core::validation::{require_non_blank, validate_input};
use appflow_db::models::techno::{CreateTechno, Techno};
use appflow_db::repositories::Repositories;

use crate::error::AppResult;

pub struct TechnoService {
    repos: Repositories,
}

impl TechnoService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Every technology, ordered by name.
    pub async fn get_all(&self) -> AppResult<Vec<Techno>> {
        Ok(self.repos.technos.list().await?)
    }

    /// Create a technology, or return the existing row with the same name.
    pub async fn save_new_techno(&self, input: &CreateTechno) -> AppResult<Techno> {
        validate_input(input)?;
        require_non_blank("name", &input.name)?;

        let techno = self.repos.technos.create_or_get(input).await?;
        tracing::debug!(techno_id = techno.id, name = %techno.name, "Techno resolved");
        Ok(techno)
    }
}

#[cfg(test)]
mod tests {
    use appflow_core::error::CoreError;
    use appflow_db::memory::MemoryStore;
    use assert_matches::assert_matches;

    use super::*;
    use crate::error::AppError;

    fn kafka() -> CreateTechno {
        CreateTechno {
            name: "Kafka".into(),
            description: Some("broker".into()),
        }
    }

    #[tokio::test]
    async fn same_name_reuses_row() {
        let store = MemoryStore::new();
        let service = TechnoService::new(store.repositories());

        let first = service.save_new_techno(&kafka()).await.unwrap();
        let second = service
            .save_new_techno(&CreateTechno {
                name: " Kafka ".into(),
                description: None,
            })
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(service.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let service = TechnoService::new(MemoryStore::new().repositories());
        let result = service
            .save_new_techno(&CreateTechno {
                name: String::new(),
                description: None,
            })
            .await;
        assert_matches!(result, Err(AppError::Core(CoreError::Validation(_))));
    }
}
