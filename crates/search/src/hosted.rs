//! REST client for a hosted, Algolia-compatible search service.
//!
//! Endpoints used, relative to the configured host:
//!
//! ```text
//! PUT    /1/indexes/{index}/{objectID}   add or replace an object
//! DELETE /1/indexes/{index}/{objectID}   delete an object
//! POST   /1/indexes/{index}/query        search
//! POST   /1/indexes/{index}/clear        remove every object
//! ```

use std::sync::Arc;

use appflow_core::search::prefixed_index_name;
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use crate::{SearchClient, SearchConfig, SearchError, SearchIndex, SearchRecord};

const HEADER_APP_ID: &str = "X-Algolia-Application-Id";
const HEADER_API_KEY: &str = "X-Algolia-API-Key";

/// HTTP client shared by every index of one provider account.
#[derive(Debug)]
pub struct HostedSearchClient {
    client: reqwest::Client,
    base_url: Url,
    config: SearchConfig,
}

/// Response body of the `/query` endpoint.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    hits: Vec<SearchRecord>,
}

impl HostedSearchClient {
    /// Create a client for the configured provider.
    ///
    /// Fails if `config.host` is not a usable base URL.
    pub fn new(config: SearchConfig) -> Result<Self, SearchError> {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling).
    pub fn with_client(client: reqwest::Client, config: SearchConfig) -> Result<Self, SearchError> {
        let base_url = Url::parse(&config.host)
            .map_err(|e| SearchError::InvalidUrl(format!("{}: {e}", config.host)))?;
        if base_url.cannot_be_a_base() {
            return Err(SearchError::InvalidUrl(config.host.clone()));
        }
        Ok(Self {
            client,
            base_url,
            config,
        })
    }
}

impl SearchClient for HostedSearchClient {
    fn init_index(&self, name: &str) -> Arc<dyn SearchIndex> {
        Arc::new(HostedIndex {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            name: prefixed_index_name(&self.config.index_prefix, name),
            app_id: self.config.app_id.clone(),
            api_key: self.config.api_key.clone(),
            hits_per_page: self.config.hits_per_page,
        })
    }
}

/// One index on the hosted provider.
pub struct HostedIndex {
    client: reqwest::Client,
    base_url: Url,
    name: String,
    app_id: String,
    api_key: String,
    hits_per_page: u32,
}

impl HostedIndex {
    /// Build `{base}/1/indexes/{index}/{segment}` with each part percent-encoded.
    fn url(&self, segment: &str) -> Result<Url, SearchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SearchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["1", "indexes", self.name.as_str(), segment]);
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header(HEADER_APP_ID, &self.app_id)
            .header(HEADER_API_KEY, &self.api_key)
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`SearchError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, SearchError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SearchError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl SearchIndex for HostedIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add_object(&self, record: &SearchRecord) -> Result<(), SearchError> {
        let url = self.url(&record.object_id)?;
        let response = self
            .request(reqwest::Method::PUT, url)
            .json(record)
            .send()
            .await?;
        Self::ensure_success(response).await?;
        tracing::debug!(index = %self.name, object_id = %record.object_id, "Search object saved");
        Ok(())
    }

    async fn delete_object(&self, object_id: &str) -> Result<(), SearchError> {
        let url = self.url(object_id)?;
        let response = self.request(reqwest::Method::DELETE, url).send().await?;
        // Deleting an object the provider never had is a no-op.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::ensure_success(response).await?;
        tracing::debug!(index = %self.name, object_id, "Search object deleted");
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchRecord>, SearchError> {
        let url = self.url("query")?;
        let body = serde_json::json!({
            "query": query,
            "hitsPerPage": self.hits_per_page,
        });
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await?;
        let parsed: QueryResponse = Self::ensure_success(response).await?.json().await?;
        Ok(parsed.hits)
    }

    async fn clear(&self) -> Result<(), SearchError> {
        let url = self.url("clear")?;
        let response = self.request(reqwest::Method::POST, url).send().await?;
        Self::ensure_success(response).await?;
        tracing::info!(index = %self.name, "Search index cleared");
        Ok(())
    }
}
