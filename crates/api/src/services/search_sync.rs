//! Write-through mirroring of rows into the search indexes.
//!
//! Every mutation commits its row first and only then touches the index.
//! When the index write fails the request still succeeds: the divergence is
//! logged and parked in the `search_outbox` table, and
//! [`SearchSync::reconcile_pending`] replays it later from the current row.

use std::collections::BTreeMap;
use std::sync::Arc;

use appflow_core::search::{
    object_id, parse_object_id, INDEX_APPS, INDEX_FLOWS, SEARCH_INDEXES,
};
use appflow_core::types::DbId;
use appflow_db::models::app::App;
use appflow_db::models::flow::Flow;
use appflow_db::models::search_outbox::{SearchOperation, SearchOutboxEntry};
use appflow_db::repositories::Repositories;
use appflow_search::{SearchClient, SearchIndex, SearchRecord};
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Projection of an App row into its search record.
pub fn app_record(app: &App) -> SearchRecord {
    SearchRecord {
        object_id: object_id(app.id),
        name: app.name.clone(),
        description: app.description.clone(),
    }
}

/// Projection of a Flow row into its search record.
pub fn flow_record(flow: &Flow) -> SearchRecord {
    SearchRecord {
        object_id: object_id(flow.id),
        name: flow.name.clone(),
        description: flow.description.clone(),
    }
}

/// A search hit mapped back to an entity-shaped record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
}

/// Map provider hits to entity-shaped records. Hits whose objectID is not a
/// valid id cannot have come from this service and are skipped.
pub fn hits_to_records(index: &str, hits: Vec<SearchRecord>) -> Vec<SearchHit> {
    hits.into_iter()
        .filter_map(|hit| match parse_object_id(&hit.object_id) {
            Some(id) => Some(SearchHit {
                id,
                name: hit.name,
                description: hit.description,
            }),
            None => {
                tracing::warn!(index, object_id = %hit.object_id, "Skipping search hit with foreign objectID");
                None
            }
        })
        .collect()
}

/// How long a reconciler holds the entries it claimed.
const CLAIM_LEASE_SECS: i64 = 300;

/// Failed attempts after which a stuck entry is logged at `warn`.
const STUCK_ATTEMPTS: i32 = 5;

/// Outcome of one outbox replay pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub replayed: usize,
    pub failed: usize,
}

/// Keeps the `apps` and `flows` indexes in step with the relational store.
pub struct SearchSync {
    repos: Repositories,
    apps_index: Arc<dyn SearchIndex>,
    flows_index: Arc<dyn SearchIndex>,
}

impl SearchSync {
    pub fn new(repos: Repositories, client: &dyn SearchClient) -> Self {
        Self {
            repos,
            apps_index: client.init_index(INDEX_APPS),
            flows_index: client.init_index(INDEX_FLOWS),
        }
    }

    /// Index handle for a logical index name (`apps` or `flows`).
    pub fn index(&self, name: &str) -> Option<&Arc<dyn SearchIndex>> {
        match name {
            INDEX_APPS => Some(&self.apps_index),
            INDEX_FLOWS => Some(&self.flows_index),
            _ => None,
        }
    }

    /// Free-text search on one index. Provider failures propagate.
    pub async fn search(&self, index_name: &str, query: &str) -> AppResult<Vec<SearchHit>> {
        let index = self.index_or_err(index_name)?;
        let hits = index.search(query).await?;
        Ok(hits_to_records(index_name, hits))
    }

    /// Mirror a committed row. Never fails the caller.
    pub async fn upsert(&self, index_name: &str, record: SearchRecord) {
        let result = match self.index(index_name) {
            Some(index) => index.add_object(&record).await.map_err(|e| e.to_string()),
            None => Err(format!("unknown index {index_name}")),
        };
        if let Err(error) = result {
            self.park(index_name, &record.object_id, SearchOperation::Upsert, &error)
                .await;
        }
    }

    /// Remove the mirror of a deleted row. Never fails the caller.
    pub async fn remove(&self, index_name: &str, object_id: &str) {
        let result = match self.index(index_name) {
            Some(index) => index.delete_object(object_id).await.map_err(|e| e.to_string()),
            None => Err(format!("unknown index {index_name}")),
        };
        if let Err(error) = result {
            self.park(index_name, object_id, SearchOperation::Delete, &error)
                .await;
        }
    }

    async fn park(&self, index_name: &str, object_id: &str, operation: SearchOperation, error: &str) {
        tracing::warn!(
            index = index_name,
            object_id,
            operation = operation.as_str(),
            error,
            "Search index write failed, row and index diverge until reconciled"
        );
        if let Err(e) = self
            .repos
            .outbox
            .enqueue(index_name, object_id, operation)
            .await
        {
            tracing::error!(
                index = index_name,
                object_id,
                error = %e,
                "Failed to record search outbox entry"
            );
        }
    }

    /// Claim and replay up to `limit` pending outbox entries, entries with
    /// the fewest failed attempts first.
    ///
    /// Upserts re-read the current row; a row that has since been deleted
    /// is removed from the index instead. An entry re-enqueued while it was
    /// being replayed stays pending and is replayed on a later pass.
    pub async fn reconcile_pending(&self, limit: i64) -> AppResult<ReconcileReport> {
        let entries = self
            .repos
            .outbox
            .claim_pending(limit, CLAIM_LEASE_SECS)
            .await?;
        let mut report = ReconcileReport::default();

        for entry in entries {
            match self.replay(&entry).await {
                Ok(()) => {
                    if !self.repos.outbox.complete(entry.id, entry.revision).await? {
                        tracing::debug!(
                            outbox_id = entry.id,
                            revision = entry.revision,
                            "Search outbox entry superseded during replay, kept pending"
                        );
                    }
                    report.replayed += 1;
                }
                Err(e) => {
                    let attempts = entry.attempts + 1;
                    if attempts >= STUCK_ATTEMPTS {
                        tracing::warn!(
                            outbox_id = entry.id,
                            index = %entry.index_name,
                            object_id = %entry.object_id,
                            attempts,
                            error = %e,
                            "Search outbox entry keeps failing"
                        );
                    } else {
                        tracing::debug!(
                            outbox_id = entry.id,
                            attempts,
                            error = %e,
                            "Search outbox replay failed"
                        );
                    }
                    self.repos
                        .outbox
                        .record_failure(entry.id, &e.to_string())
                        .await?;
                    report.failed += 1;
                }
            }
        }

        if report.replayed > 0 || report.failed > 0 {
            tracing::info!(
                replayed = report.replayed,
                failed = report.failed,
                "Search outbox reconciled"
            );
        }
        Ok(report)
    }

    async fn replay(&self, entry: &SearchOutboxEntry) -> AppResult<()> {
        let index = self.index_or_err(&entry.index_name)?;
        let operation = entry.operation().ok_or_else(|| {
            AppError::InternalError(format!("unknown outbox operation {}", entry.operation))
        })?;
        let id = parse_object_id(&entry.object_id).ok_or_else(|| {
            AppError::InternalError(format!("invalid outbox object id {}", entry.object_id))
        })?;

        let current = match operation {
            SearchOperation::Upsert => self.current_record(&entry.index_name, id).await?,
            SearchOperation::Delete => None,
        };
        match current {
            Some(record) => index.add_object(&record).await?,
            None => index.delete_object(&entry.object_id).await?,
        }
        Ok(())
    }

    async fn current_record(&self, index_name: &str, id: DbId) -> AppResult<Option<SearchRecord>> {
        let record = match index_name {
            INDEX_APPS => self.repos.apps.find_by_id(id).await?.map(|a| app_record(&a)),
            INDEX_FLOWS => self
                .repos
                .flows
                .find_with_relations(id)
                .await?
                .map(|f| flow_record(&f.flow)),
            _ => None,
        };
        Ok(record)
    }

    /// Rebuild one index from the relational store. Returns the number of
    /// objects written.
    pub async fn reindex(&self, index_name: &str) -> AppResult<usize> {
        let index = self.index_or_err(index_name)?;
        let records: Vec<SearchRecord> = match index_name {
            INDEX_APPS => self.repos.apps.list().await?.iter().map(app_record).collect(),
            INDEX_FLOWS => self
                .repos
                .flows
                .list_with_relations()
                .await?
                .iter()
                .map(|f| flow_record(&f.flow))
                .collect(),
            _ => Vec::new(),
        };

        index.clear().await?;
        for record in &records {
            index.add_object(record).await?;
        }
        tracing::info!(index = index_name, objects = records.len(), "Search index rebuilt");
        Ok(records.len())
    }

    /// Rebuild every managed index. Keyed by index name.
    pub async fn reindex_all(&self) -> AppResult<BTreeMap<String, usize>> {
        let mut report = BTreeMap::new();
        for name in SEARCH_INDEXES {
            report.insert(name.to_string(), self.reindex(name).await?);
        }
        Ok(report)
    }

    fn index_or_err(&self, name: &str) -> AppResult<&Arc<dyn SearchIndex>> {
        self.index(name)
            .ok_or_else(|| AppError::InternalError(format!("unknown index {name}")))
    }
}

#[cfg(test)]
mod tests {
    use appflow_db::memory::MemoryStore;
    use appflow_db::models::app::CreateApp;
    use appflow_search::memory::{MemoryIndex, MemorySearchClient};
    use appflow_search::SearchError;
    use async_trait::async_trait;

    use super::*;

    /// Index whose successful writes are followed by a concurrent request
    /// that deletes the app row and parks a `Delete` for the same object.
    struct RacingIndex {
        inner: Arc<MemoryIndex>,
        store: MemoryStore,
    }

    #[async_trait]
    impl SearchIndex for RacingIndex {
        fn name(&self) -> &str {
            self.inner.name()
        }

        async fn add_object(&self, record: &SearchRecord) -> Result<(), SearchError> {
            self.inner.add_object(record).await?;
            let repos = self.store.repositories();
            if let Some(id) = parse_object_id(&record.object_id) {
                repos.apps.delete(id).await.unwrap();
            }
            repos
                .outbox
                .enqueue(INDEX_APPS, &record.object_id, SearchOperation::Delete)
                .await
                .unwrap();
            Ok(())
        }

        async fn delete_object(&self, object_id: &str) -> Result<(), SearchError> {
            self.inner.delete_object(object_id).await
        }

        async fn search(&self, query: &str) -> Result<Vec<SearchRecord>, SearchError> {
            self.inner.search(query).await
        }

        async fn clear(&self) -> Result<(), SearchError> {
            self.inner.clear().await
        }
    }

    struct RacingClient {
        memory: MemorySearchClient,
        store: MemoryStore,
    }

    impl SearchClient for RacingClient {
        fn init_index(&self, name: &str) -> Arc<dyn SearchIndex> {
            match name {
                INDEX_APPS => Arc::new(RacingIndex {
                    inner: self.memory.index(name),
                    store: self.store.clone(),
                }),
                _ => self.memory.init_index(name),
            }
        }
    }

    fn setup() -> (MemoryStore, MemorySearchClient, SearchSync) {
        let store = MemoryStore::new();
        let client = MemorySearchClient::new();
        let sync = SearchSync::new(store.repositories(), &client);
        (store, client, sync)
    }

    async fn create_app(store: &MemoryStore, name: &str) -> App {
        store
            .repositories()
            .apps
            .create(&CreateApp {
                name: name.into(),
                description: None,
            })
            .await
            .unwrap()
    }

    #[test]
    fn foreign_hits_are_skipped() {
        let hits = vec![
            SearchRecord {
                object_id: "3".into(),
                name: "CRM".into(),
                description: None,
            },
            SearchRecord {
                object_id: "legacy-abc".into(),
                name: "Old".into(),
                description: None,
            },
        ];
        let mapped = hits_to_records(INDEX_APPS, hits);
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].id, 3);
    }

    #[tokio::test]
    async fn failed_upsert_is_parked_and_replayed_from_current_row() {
        let (store, client, sync) = setup();
        let app = create_app(&store, "CRM").await;

        client.index(INDEX_APPS).set_unavailable(true);
        sync.upsert(INDEX_APPS, app_record(&app)).await;
        assert_eq!(store.repositories().outbox.count().await.unwrap(), 1);

        // Still down: the entry stays and its attempt counter grows.
        let report = sync.reconcile_pending(10).await.unwrap();
        assert_eq!(report, ReconcileReport { replayed: 0, failed: 1 });
        let pending = store.repositories().outbox.list_pending(10).await.unwrap();
        assert_eq!(pending[0].attempts, 1);
        assert!(pending[0].last_error.is_some());

        client.index(INDEX_APPS).set_unavailable(false);
        let report = sync.reconcile_pending(10).await.unwrap();
        assert_eq!(report, ReconcileReport { replayed: 1, failed: 0 });
        assert_eq!(store.repositories().outbox.count().await.unwrap(), 0);
        assert_eq!(
            client.index(INDEX_APPS).get(&app.id.to_string()).map(|r| r.name),
            Some("CRM".to_string())
        );
    }

    #[tokio::test]
    async fn replayed_upsert_of_deleted_row_removes_object() {
        let (store, client, sync) = setup();
        let app = create_app(&store, "Gone").await;
        sync.upsert(INDEX_APPS, app_record(&app)).await;
        assert_eq!(client.index(INDEX_APPS).len(), 1);

        store
            .repositories()
            .outbox
            .enqueue(INDEX_APPS, &app.id.to_string(), SearchOperation::Upsert)
            .await
            .unwrap();
        store.repositories().apps.delete(app.id).await.unwrap();

        sync.reconcile_pending(10).await.unwrap();
        assert!(client.index(INDEX_APPS).is_empty());
    }

    #[tokio::test]
    async fn intent_enqueued_during_replay_survives() {
        let store = MemoryStore::new();
        let memory = MemorySearchClient::new();
        let app = create_app(&store, "CRM").await;
        let object_id = app.id.to_string();
        store
            .repositories()
            .outbox
            .enqueue(INDEX_APPS, &object_id, SearchOperation::Upsert)
            .await
            .unwrap();

        let client = RacingClient {
            memory: memory.clone(),
            store: store.clone(),
        };
        let sync = SearchSync::new(store.repositories(), &client);

        let report = sync.reconcile_pending(10).await.unwrap();
        assert_eq!(report, ReconcileReport { replayed: 1, failed: 0 });
        let pending = store.repositories().outbox.list_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].operation(), Some(SearchOperation::Delete));
        assert!(memory.index(INDEX_APPS).get(&object_id).is_some());

        // The next pass applies the delete through the plain index.
        let sync = SearchSync::new(store.repositories(), &memory);
        sync.reconcile_pending(10).await.unwrap();
        assert_eq!(store.repositories().outbox.count().await.unwrap(), 0);
        assert!(memory.index(INDEX_APPS).get(&object_id).is_none());
    }

    #[tokio::test]
    async fn stuck_entry_does_not_starve_newer_ones() {
        let (store, client, sync) = setup();
        let outbox = store.repositories().outbox;
        let stuck = outbox
            .enqueue(INDEX_APPS, "not-a-number", SearchOperation::Upsert)
            .await
            .unwrap();

        let report = sync.reconcile_pending(1).await.unwrap();
        assert_eq!(report.failed, 1);

        let app = create_app(&store, "CRM").await;
        outbox
            .enqueue(INDEX_APPS, &app.id.to_string(), SearchOperation::Upsert)
            .await
            .unwrap();

        let report = sync.reconcile_pending(1).await.unwrap();
        assert_eq!(report, ReconcileReport { replayed: 1, failed: 0 });
        assert_eq!(client.index(INDEX_APPS).len(), 1);
        let pending = outbox.list_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, stuck.id);
    }

    #[tokio::test]
    async fn failed_remove_is_parked() {
        let (store, client, sync) = setup();
        client.index(INDEX_FLOWS).set_unavailable(true);
        sync.remove(INDEX_FLOWS, "12").await;

        let pending = store.repositories().outbox.list_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].operation(), Some(SearchOperation::Delete));
        assert_eq!(pending[0].index_name, INDEX_FLOWS);
    }

    #[tokio::test]
    async fn reindex_rebuilds_from_rows() {
        let (store, client, sync) = setup();
        create_app(&store, "CRM").await;
        create_app(&store, "ESB").await;
        client
            .index(INDEX_APPS)
            .add_object(&SearchRecord {
                object_id: "999".into(),
                name: "stale".into(),
                description: None,
            })
            .await
            .unwrap();

        let report = sync.reindex_all().await.unwrap();
        assert_eq!(report.get(INDEX_APPS), Some(&2));
        assert_eq!(report.get(INDEX_FLOWS), Some(&0));
        assert!(client.index(INDEX_APPS).get("999").is_none());
        assert_eq!(client.index(INDEX_APPS).len(), 2);
    }
}
