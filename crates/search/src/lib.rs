//! Search-index adapter.
//!
//! A [`SearchClient`] hands out one [`SearchIndex`] per entity type. Two
//! implementations are provided:
//!
//! - [`hosted::HostedSearchClient`] -- talks to a hosted, Algolia-compatible
//!   REST API with [`reqwest`].
//! - [`memory::MemorySearchClient`] -- an in-process index used for local
//!   development and tests.

pub mod config;
pub mod error;
pub mod hosted;
pub mod memory;
pub mod record;

use std::sync::Arc;

use async_trait::async_trait;

pub use config::SearchConfig;
pub use error::SearchError;
pub use record::SearchRecord;

/// One named index on the search provider.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Index name as seen by the provider (prefix included).
    fn name(&self) -> &str;

    /// Insert or replace the object with `record.object_id`.
    async fn add_object(&self, record: &SearchRecord) -> Result<(), SearchError>;

    /// Remove an object. Removing an unknown object is not an error.
    async fn delete_object(&self, object_id: &str) -> Result<(), SearchError>;

    /// Free-text search. An empty query matches every object.
    async fn search(&self, query: &str) -> Result<Vec<SearchRecord>, SearchError>;

    /// Remove every object from the index.
    async fn clear(&self) -> Result<(), SearchError>;
}

/// Factory for per-entity indexes.
pub trait SearchClient: Send + Sync {
    fn init_index(&self, name: &str) -> Arc<dyn SearchIndex>;
}
