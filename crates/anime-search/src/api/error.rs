use thiserror::Error;

/// Errors from the catalog client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The request was superseded and its issuer asked it to stop.
    #[error("request cancelled")]
    Cancelled,

    /// The catalog answered HTTP 429.
    #[error("Too many requests to the catalog. Please wait a moment before trying again.")]
    RateLimited,

    /// Transport failure, non-2xx status, or an unreadable body.
    #[error("{0}")]
    RequestFailed(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        if e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            return Self::RateLimited;
        }
        Self::RequestFailed(format!("Request failed: {e}"))
    }
}

impl CatalogError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
