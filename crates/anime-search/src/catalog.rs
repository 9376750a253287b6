//! The catalog seam.
//!
//! The search session, detail view and random picker depend on [`Catalog`]
//! rather than on the HTTP client directly, so tests can drive them with
//! in-memory fakes.

use std::future::Future;

use shared::{AnimeDetail, AnimeSummary, PaginationInfo};
use tracing::debug;

use crate::api::CatalogError;
use crate::cancel::CancellationToken;

/// One search fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub query: String,
    pub page: u32,
    pub page_size: u32,
}

/// A page of results plus the server's pagination facts.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub items: Vec<AnimeSummary>,
    pub pagination: PaginationInfo,
}

/// Read access to a remote anime catalog.
pub trait Catalog: Send + Sync + 'static {
    /// Text search. Resolves to `CatalogError::Cancelled` when `cancel` fires first.
    fn search(
        &self,
        request: &PageRequest,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<SearchPage, CatalogError>> + Send;

    /// Look up one title. `Ok(None)` means the catalog has no such record.
    fn get_by_id(
        &self,
        id: u32,
    ) -> impl Future<Output = Result<Option<AnimeDetail>, CatalogError>> + Send;

    /// Top-ranked titles.
    fn top_list(
        &self,
        page_size: u32,
        page: u32,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<SearchPage, CatalogError>> + Send;
}

/// Landing-view recommendations: the first `limit` top-ranked titles.
pub async fn recommendations<C: Catalog>(
    catalog: &C,
    limit: u32,
) -> Result<Vec<AnimeSummary>, CatalogError> {
    let page = catalog
        .top_list(limit.max(1), 1, &CancellationToken::new())
        .await?;
    debug!(limit, count = page.items.len(), "Loaded recommendations");
    Ok(page.items)
}


#[cfg(test)]
pub(crate) mod fake {
    //! Scripted in-memory catalog used by the controller, detail and picker tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use shared::{AiringRange, Genre, ImageUrls};

    /// A recorded call, in issue order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Search { query: String, page: u32 },
        GetById(u32),
        TopList { page_size: u32, page: u32 },
    }

    /// How the fake answers one search/top-list page.
    #[derive(Debug, Clone)]
    pub struct Reply {
        pub delay: Duration,
        pub outcome: Result<SearchPage, CatalogError>,
    }

    #[derive(Default)]
    pub struct FakeCatalog {
        calls: Mutex<Vec<Call>>,
        search_replies: Mutex<HashMap<(String, u32), Reply>>,
        top_replies: Mutex<HashMap<u32, Reply>>,
        details: Mutex<HashMap<u32, Result<Option<AnimeDetail>, CatalogError>>>,
        detail_delays: Mutex<HashMap<u32, Duration>>,
        /// When set, search ignores cancellation and always delivers its scripted reply.
        pub ignore_cancel: bool,
    }

    impl FakeCatalog {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn uncooperative() -> Self {
            Self {
                ignore_cancel: true,
                ..Self::default()
            }
        }

        pub fn on_search(&self, query: &str, page: u32, delay_ms: u64, outcome: Result<SearchPage, CatalogError>) {
            self.search_replies.lock().unwrap().insert(
                (query.to_string(), page),
                Reply {
                    delay: Duration::from_millis(delay_ms),
                    outcome,
                },
            );
        }

        pub fn on_top(&self, page: u32, outcome: Result<SearchPage, CatalogError>) {
            self.top_replies.lock().unwrap().insert(
                page,
                Reply {
                    delay: Duration::ZERO,
                    outcome,
                },
            );
        }

        pub fn on_detail(&self, id: u32, outcome: Result<Option<AnimeDetail>, CatalogError>) {
            self.details.lock().unwrap().insert(id, outcome);
        }

        pub fn delay_detail(&self, id: u32, delay_ms: u64) {
            self.detail_delays
                .lock()
                .unwrap()
                .insert(id, Duration::from_millis(delay_ms));
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn search_calls(&self) -> Vec<(String, u32)> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Search { query, page } => Some((query, page)),
                    _ => None,
                })
                .collect()
        }

        async fn answer(
            &self,
            reply: Option<Reply>,
            cancel: &CancellationToken,
            honor_cancel: bool,
        ) -> Result<SearchPage, CatalogError> {
            let Some(reply) = reply else {
                return Err(CatalogError::RequestFailed("no scripted reply".to_string()));
            };
            if honor_cancel {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(CatalogError::Cancelled),
                    _ = tokio::time::sleep(reply.delay) => {}
                }
            } else {
                tokio::time::sleep(reply.delay).await;
            }
            reply.outcome
        }
    }

    impl Catalog for FakeCatalog {
        async fn search(
            &self,
            request: &PageRequest,
            cancel: &CancellationToken,
        ) -> Result<SearchPage, CatalogError> {
            self.calls.lock().unwrap().push(Call::Search {
                query: request.query.clone(),
                page: request.page,
            });
            let reply = self
                .search_replies
                .lock()
                .unwrap()
                .get(&(request.query.clone(), request.page))
                .cloned();
            self.answer(reply, cancel, !self.ignore_cancel).await
        }

        async fn get_by_id(&self, id: u32) -> Result<Option<AnimeDetail>, CatalogError> {
            self.calls.lock().unwrap().push(Call::GetById(id));
            let delay = self.detail_delays.lock().unwrap().get(&id).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.details
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .unwrap_or(Ok(None))
        }

        async fn top_list(
            &self,
            page_size: u32,
            page: u32,
            cancel: &CancellationToken,
        ) -> Result<SearchPage, CatalogError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::TopList { page_size, page });
            let reply = self.top_replies.lock().unwrap().get(&page).cloned();
            self.answer(reply, cancel, true).await
        }
    }

    pub fn anime(id: u32, title: &str) -> AnimeSummary {
        AnimeSummary {
            id,
            url: None,
            title: title.to_string(),
            title_english: None,
            title_japanese: None,
            title_synonyms: Vec::new(),
            score: None,
            year: None,
            episodes: None,
            synopsis: None,
            aired: AiringRange::default(),
            genres: Vec::new(),
            explicit_genres: Vec::new(),
            studios: Vec::new(),
            images: ImageUrls::default(),
        }
    }

    pub fn with_genres(mut anime: AnimeSummary, names: &[&str]) -> AnimeSummary {
        anime.genres = names
            .iter()
            .enumerate()
            .map(|(i, n)| Genre {
                id: i as u32 + 1,
                name: n.to_string(),
            })
            .collect();
        anime
    }

    pub fn detail(id: u32, title: &str) -> AnimeDetail {
        AnimeDetail {
            summary: anime(id, title),
            anime_type: None,
            source: None,
            status: None,
            duration: None,
            rating: None,
            season: None,
            rank: None,
            popularity: None,
            members: None,
            scored_by: None,
            background: None,
            themes: Vec::new(),
            demographics: Vec::new(),
            producers: Vec::new(),
        }
    }

    /// A page whose pagination reports `current_page` of `last_page`.
    pub fn page(items: Vec<AnimeSummary>, current_page: u32, last_page: u32) -> SearchPage {
        let count = items.len() as u32;
        SearchPage {
            items,
            pagination: PaginationInfo {
                current_page,
                last_visible_page: last_page,
                has_next_page: current_page < last_page,
                items_per_page: 25,
                total_items: last_page * 25,
                current_page_items: count,
            },
        }
    }
}
