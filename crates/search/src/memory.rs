//! In-process search index.
//!
//! Used when no hosted provider is configured and by the test suites. Every
//! index handed out under the same name shares its contents, so a test can
//! inspect what a service wrote.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::{SearchClient, SearchError, SearchIndex, SearchRecord};

/// [`SearchClient`] backed by process memory.
#[derive(Clone, Default)]
pub struct MemorySearchClient {
    indexes: Arc<Mutex<HashMap<String, Arc<MemoryIndex>>>>,
}

impl MemorySearchClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concrete handle on an index, created empty on first use.
    pub fn index(&self, name: &str) -> Arc<MemoryIndex> {
        let mut indexes = self
            .indexes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        indexes
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryIndex::new(name)))
            .clone()
    }
}

impl SearchClient for MemorySearchClient {
    fn init_index(&self, name: &str) -> Arc<dyn SearchIndex> {
        self.index(name)
    }
}

/// One in-memory index. Objects keep insertion order; replacing an object
/// keeps its slot.
pub struct MemoryIndex {
    name: String,
    objects: Mutex<Vec<SearchRecord>>,
    unavailable: AtomicBool,
}

impl MemoryIndex {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            objects: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate a provider outage: every operation fails until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of the stored objects.
    pub fn objects(&self) -> Vec<SearchRecord> {
        self.lock().clone()
    }

    pub fn get(&self, object_id: &str) -> Option<SearchRecord> {
        self.lock()
            .iter()
            .find(|r| r.object_id == object_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SearchRecord>> {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<(), SearchError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SearchError::Unavailable(self.name.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add_object(&self, record: &SearchRecord) -> Result<(), SearchError> {
        self.check_available()?;
        let mut objects = self.lock();
        match objects.iter_mut().find(|r| r.object_id == record.object_id) {
            Some(existing) => *existing = record.clone(),
            None => objects.push(record.clone()),
        }
        Ok(())
    }

    async fn delete_object(&self, object_id: &str) -> Result<(), SearchError> {
        self.check_available()?;
        self.lock().retain(|r| r.object_id != object_id);
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchRecord>, SearchError> {
        self.check_available()?;
        Ok(self
            .lock()
            .iter()
            .filter(|r| r.matches(query))
            .cloned()
            .collect())
    }

    async fn clear(&self) -> Result<(), SearchError> {
        self.check_available()?;
        self.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn record(id: &str, name: &str) -> SearchRecord {
        SearchRecord {
            object_id: id.into(),
            name: name.into(),
            description: None,
        }
    }

    #[tokio::test]
    async fn indexes_with_same_name_share_contents() {
        let client = MemorySearchClient::new();
        let writer = client.init_index("apps");
        writer.add_object(&record("1", "CRM")).await.unwrap();

        let reader = client.init_index("apps");
        assert_eq!(reader.search("").await.unwrap().len(), 1);
        assert!(client.index("flows").is_empty());
    }

    #[tokio::test]
    async fn add_replaces_in_place() {
        let index = MemorySearchClient::new().index("apps");
        index.add_object(&record("1", "CRM")).await.unwrap();
        index.add_object(&record("2", "ESB")).await.unwrap();
        index.add_object(&record("1", "CRM v2")).await.unwrap();

        let names: Vec<_> = index.objects().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["CRM v2", "ESB"]);
    }

    #[tokio::test]
    async fn search_filters_by_query() {
        let index = MemorySearchClient::new().index("apps");
        index.add_object(&record("1", "CRM")).await.unwrap();
        index.add_object(&record("2", "ESB")).await.unwrap();

        let hits = index.search("esb").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].object_id, "2");
    }

    #[tokio::test]
    async fn delete_unknown_object_is_ok() {
        let index = MemorySearchClient::new().index("apps");
        index.delete_object("42").await.unwrap();
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn unavailable_index_rejects_operations() {
        let index = MemorySearchClient::new().index("apps");
        index.set_unavailable(true);
        assert_matches!(
            index.add_object(&record("1", "CRM")).await,
            Err(SearchError::Unavailable(_))
        );
        assert_matches!(index.search("").await, Err(SearchError::Unavailable(_)));

        index.set_unavailable(false);
        index.add_object(&record("1", "CRM")).await.unwrap();
        assert_eq!(index.get("1").map(|r| r.name), Some("CRM".to_string()));
    }
}
