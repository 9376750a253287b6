//! Jikan API client with request pacing and cooperative cancellation.

use super::error::CatalogError;
use super::rate_limiter::RateLimiter;
use super::types::*;
use crate::cancel::CancellationToken;
use crate::catalog::{Catalog, PageRequest, SearchPage};
use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use shared::config::CatalogConfig;
use shared::{AnimeDetail, AnimeSummary};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Jikan API v4 client
pub struct JikanClient {
    /// HTTP client
    client: Client,
    /// Base URL for Jikan API
    base_url: String,
    /// Request pacing, shared by every in-flight call
    rate_limiter: Mutex<RateLimiter>,
}

impl JikanClient {
    /// Create a new Jikan client
    pub fn new(
        base_url: String,
        requests_per_second: f64,
        requests_per_minute: u32,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter: Mutex::new(RateLimiter::new(requests_per_second, requests_per_minute)),
        })
    }

    /// Create a client from the `[catalog]` config section
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            config.rate_limit.requests_per_second,
            config.rate_limit.requests_per_minute,
            config.timeout(),
            &config.user_agent,
        )
    }

    fn search_request(&self, request: &PageRequest) -> RequestBuilder {
        let mut builder = self.client.get(format!("{}/anime", self.base_url));

        let query = request.query.trim();
        if !query.is_empty() {
            builder = builder.query(&[("q", query)]);
        }

        builder.query(&[("limit", request.page_size), ("page", request.page)])
    }

    fn top_request(&self, page_size: u32, page: u32) -> RequestBuilder {
        self.client
            .get(format!("{}/top/anime", self.base_url))
            .query(&[("limit", page_size), ("page", page)])
    }

    fn detail_request(&self, id: u32) -> RequestBuilder {
        self.client.get(format!("{}/anime/{}", self.base_url, id))
    }

    /// Pace, send, and turn HTTP failures into catalog errors.
    ///
    /// A 404 is handed back to the caller, which decides whether it means "no record".
    async fn send(&self, builder: RequestBuilder, action: &str) -> Result<Response, CatalogError> {
        self.rate_limiter.lock().await.acquire().await;

        let request = builder.build()?;
        debug!(url = %request.url(), "Making API request");

        let response = self.client.execute(request).await?;
        let status = response.status();

        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(response);
        }

        let message = response
            .json::<JikanError>()
            .await
            .ok()
            .and_then(|e| e.message);
        warn!(status = %status, message = ?message, "Request failed");

        Err(status_error(status, action))
    }

    async fn fetch_page(
        &self,
        builder: RequestBuilder,
        action: &str,
        page: u32,
        page_size: u32,
    ) -> Result<SearchPage, CatalogError> {
        let response = self.send(builder, action).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(status_error(StatusCode::NOT_FOUND, action));
        }

        let body: PaginatedResponse<AnimeEntry> = response
            .json()
            .await
            .map_err(|e| CatalogError::RequestFailed(format!("Failed to parse response: {e}")))?;

        Ok(SearchPage {
            items: body.data.into_iter().map(AnimeSummary::from).collect(),
            pagination: body.pagination.into_info(page, page_size),
        })
    }
}

/// Map a non-success status to the catalog error taxonomy
fn status_error(status: StatusCode, action: &str) -> CatalogError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return CatalogError::RateLimited;
    }
    let reason = status.canonical_reason().unwrap_or("Unknown error");
    CatalogError::RequestFailed(format!("Failed to {action}: {reason}"))
}

/// Race a catalog call against its cancellation token
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl std::future::Future<Output = Result<T, CatalogError>>,
) -> Result<T, CatalogError> {
    if cancel.is_cancelled() {
        return Err(CatalogError::Cancelled);
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(CatalogError::Cancelled),
        result = fut => result,
    }
}

impl Catalog for JikanClient {
    async fn search(
        &self,
        request: &PageRequest,
        cancel: &CancellationToken,
    ) -> Result<SearchPage, CatalogError> {
        debug!(query = %request.query, page = request.page, "Searching anime");
        let builder = self.search_request(request);
        cancellable(
            cancel,
            self.fetch_page(builder, "search anime", request.page, request.page_size),
        )
        .await
    }

    async fn get_by_id(&self, id: u32) -> Result<Option<AnimeDetail>, CatalogError> {
        debug!(mal_id = id, "Fetching anime details");
        let response = self
            .send(self.detail_request(id), "fetch anime details")
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(mal_id = id, "Anime not found");
            return Ok(None);
        }

        let body: DataResponse<AnimeEntry> = response
            .json()
            .await
            .map_err(|e| CatalogError::RequestFailed(format!("Failed to parse response: {e}")))?;

        Ok(body.data.map(AnimeEntry::into_detail))
    }

    async fn top_list(
        &self,
        page_size: u32,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<SearchPage, CatalogError> {
        debug!(page_size, page, "Fetching top anime");
        let builder = self.top_request(page_size, page);
        cancellable(cancel, self.fetch_page(builder, "fetch top anime", page, page_size)).await
    }
}
