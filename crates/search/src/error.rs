/// Errors from the search-index layer.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Search API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The configured host cannot be used as a base URL.
    #[error("Invalid search host URL: {0}")]
    InvalidUrl(String),

    /// The index refused the operation (in-process index taken offline).
    #[error("Search index unavailable: {0}")]
    Unavailable(String),
}
