/// Default number of hits requested per search.
const DEFAULT_HITS_PER_PAGE: u32 = 50;

/// Credentials and endpoint of the hosted search provider.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Application id, sent as `X-Algolia-Application-Id`.
    pub app_id: String,
    /// API key, sent as `X-Algolia-API-Key`.
    pub api_key: String,
    /// Base URL of the REST API (default: `https://{app_id}-dsn.algolia.net`).
    pub host: String,
    /// Namespace prepended to every index name (default: empty).
    pub index_prefix: String,
    /// Hits requested per search (default: `50`).
    pub hits_per_page: u32,
}

impl SearchConfig {
    /// Load the hosted search configuration from environment variables.
    ///
    /// | Env Var                 | Required | Default                           |
    /// |-------------------------|----------|-----------------------------------|
    /// | `SEARCH_APP_ID`         | yes      | --                                |
    /// | `SEARCH_API_KEY`        | yes      | --                                |
    /// | `SEARCH_HOST`           | no       | `https://{app_id}-dsn.algolia.net`|
    /// | `SEARCH_INDEX_PREFIX`   | no       | empty                             |
    /// | `SEARCH_HITS_PER_PAGE`  | no       | `50`                              |
    ///
    /// Returns `None` when either credential is missing or empty, in which
    /// case the caller falls back to the in-process index.
    ///
    /// # Panics
    ///
    /// Panics if `SEARCH_HITS_PER_PAGE` is set but not a valid `u32`.
    pub fn from_env() -> Option<Self> {
        let app_id = non_empty_var("SEARCH_APP_ID")?;
        let api_key = non_empty_var("SEARCH_API_KEY")?;

        let host = non_empty_var("SEARCH_HOST")
            .unwrap_or_else(|| format!("https://{app_id}-dsn.algolia.net"));

        let index_prefix = std::env::var("SEARCH_INDEX_PREFIX").unwrap_or_default();

        let hits_per_page: u32 = std::env::var("SEARCH_HITS_PER_PAGE")
            .unwrap_or_else(|_| DEFAULT_HITS_PER_PAGE.to_string())
            .parse()
            .expect("SEARCH_HITS_PER_PAGE must be a valid u32");

        Some(Self {
            app_id,
            api_key,
            host,
            index_prefix,
            hits_per_page,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
