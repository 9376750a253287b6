//! Search session controller.
//!
//! Turns raw input (query text, page clicks, clear) into a minimal,
//! correctly ordered sequence of catalog fetches and keeps the local page
//! cursor consistent with what the server reports.
//!
//! Query edits and page changes share one stream with a single cancellation
//! point: issuing a request always cancels the previous one, and a response
//! is applied only if it belongs to the request that is still current.
//! Everything the session owns is mutated from `&mut self` methods, so the
//! caller's event loop serializes all changes.

use std::sync::Arc;
use std::time::Duration;

use shared::{AnimeSummary, PaginationInfo};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::api::CatalogError;
use crate::cancel::CancellationToken;
use crate::catalog::{Catalog, PageRequest, SearchPage};

/// Quiet period after the last keystroke before a search goes out
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Items requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 25;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("page numbers start at 1, got {0}")]
    InvalidPage(u32),
}

/// What the session currently shows
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub query: String,
    /// Page cursor: last page requested by the user or confirmed by the server
    pub page: u32,
    pub results: Vec<AnimeSummary>,
    pub pagination: Option<PaginationInfo>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            query: String::new(),
            page: 1,
            results: Vec::new(),
            pagination: None,
            loading: false,
            error: None,
        }
    }
}

/// Identity of one issued request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

/// Outcome of one [`SearchSession::step`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// The debounce timer fired and a request went out
    Issued(PageRequest),
    /// The current request succeeded; `corrected_page` is set when the server moved the cursor
    Applied {
        request: PageRequest,
        corrected_page: Option<u32>,
    },
    /// The current request failed; the message is now in `state().error`
    Failed(String),
    /// A superseded or cancelled request resolved and was ignored
    Discarded(RequestId),
}

struct InFlight {
    id: RequestId,
    request: PageRequest,
    token: CancellationToken,
    task: JoinHandle<()>,
}

struct Completion {
    id: RequestId,
    outcome: Result<SearchPage, CatalogError>,
}

/// Search session controller
///
/// Issuing a request spawns a task on the current tokio runtime, so
/// [`set_page`](Self::set_page) and [`step`](Self::step) must run inside one.
pub struct SearchSession<C: Catalog> {
    catalog: Arc<C>,
    debounce: Duration,
    page_size: u32,
    state: SessionState,
    debounce_deadline: Option<Instant>,
    in_flight: Option<InFlight>,
    /// Requests cancelled but possibly still running; aborted on close
    retired: Vec<JoinHandle<()>>,
    next_id: u64,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl<C: Catalog> SearchSession<C> {
    pub fn new(catalog: Arc<C>, debounce: Duration, page_size: u32) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            catalog,
            debounce,
            page_size: page_size.max(1),
            state: SessionState::default(),
            debounce_deadline: None,
            in_flight: None,
            retired: Vec::new(),
            next_id: 0,
            completions_tx,
            completions_rx,
        }
    }

    pub fn with_defaults(catalog: Arc<C>) -> Self {
        Self::new(catalog, DEFAULT_DEBOUNCE, DEFAULT_PAGE_SIZE)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The request whose response would be applied, if any
    pub fn current_request(&self) -> Option<&PageRequest> {
        self.in_flight.as_ref().map(|f| &f.request)
    }

    pub fn has_pending_debounce(&self) -> bool {
        self.debounce_deadline.is_some()
    }

    /// No timer pending and nothing in flight
    pub fn is_idle(&self) -> bool {
        self.debounce_deadline.is_none() && self.in_flight.is_none()
    }

    /// Store new query text and (re)start the debounce timer.
    ///
    /// The page cursor resets to 1 and any in-flight request is cancelled,
    /// so nothing from the previous query can land while the timer runs.
    /// Blank text schedules nothing and leaves the displayed results alone.
    pub fn set_query(&mut self, text: impl Into<String>) {
        self.state.query = text.into();
        self.state.page = 1;
        self.debounce_deadline = None;

        if self.cancel_in_flight() {
            self.state.loading = false;
        }

        if self.state.query.trim().is_empty() {
            debug!("Blank query, no search scheduled");
            return;
        }

        self.debounce_deadline = Some(Instant::now() + self.debounce);
        debug!(query = %self.state.query, debounce_ms = self.debounce.as_millis(), "Search scheduled");
    }

    /// Jump to page `n` right away, without debouncing.
    ///
    /// Pages past the last known page are still requested; the server decides.
    /// With a blank query only the cursor moves.
    pub fn set_page(&mut self, n: u32) -> Result<(), SessionError> {
        if n == 0 {
            return Err(SessionError::InvalidPage(n));
        }

        if let Some(info) = &self.state.pagination {
            if n > info.last_visible_page {
                warn!(
                    page = n,
                    last_visible_page = info.last_visible_page,
                    "Requested page beyond last known page"
                );
            }
        }

        self.state.page = n;
        self.debounce_deadline = None;

        if self.state.query.trim().is_empty() {
            debug!(page = n, "Blank query, page change not fetched");
            return Ok(());
        }

        self.issue();
        Ok(())
    }

    /// Advance one page if the server reported another one
    pub fn next_page(&mut self) -> bool {
        match self.state.pagination {
            Some(info) if self.state.page < info.last_visible_page => {
                self.set_page(self.state.page + 1).is_ok()
            }
            _ => false,
        }
    }

    /// Go back one page unless already on the first
    pub fn prev_page(&mut self) -> bool {
        if self.state.page <= 1 {
            return false;
        }
        self.set_page(self.state.page - 1).is_ok()
    }

    /// Explicit clear: drop the query, results and pagination.
    pub fn clear(&mut self) {
        self.debounce_deadline = None;
        self.cancel_in_flight();
        self.state = SessionState::default();
        info!("Search cleared");
    }

    /// Wait for the next event and handle it.
    ///
    /// Returns `None` right away when the session is idle and no stale
    /// response is waiting to be discarded.
    pub async fn step(&mut self) -> Option<SessionUpdate> {
        if self.is_idle() {
            return match self.completions_rx.try_recv() {
                Ok(completion) => Some(self.on_completion(completion)),
                Err(_) => None,
            };
        }

        let deadline = self.debounce_deadline;
        tokio::select! {
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                self.debounce_deadline = None;
                Some(SessionUpdate::Issued(self.issue()))
            }
            Some(completion) = self.completions_rx.recv() => Some(self.on_completion(completion)),
        }
    }

    /// Drive the session until nothing is pending or in flight
    pub async fn run_until_idle(&mut self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        while !self.is_idle() {
            if let Some(update) = self.step().await {
                updates.push(update);
            }
        }
        updates
    }

    /// Release timer and requests; state is kept as is.
    pub fn close(&mut self) {
        self.debounce_deadline = None;
        if let Some(flight) = self.in_flight.take() {
            flight.token.cancel();
            flight.task.abort();
        }
        for task in self.retired.drain(..) {
            task.abort();
        }
    }

    fn issue(&mut self) -> PageRequest {
        self.cancel_in_flight();

        self.next_id += 1;
        let id = RequestId(self.next_id);
        let request = PageRequest {
            query: self.state.query.trim().to_string(),
            page: self.state.page,
            page_size: self.page_size,
        };
        let token = CancellationToken::new();

        let catalog = Arc::clone(&self.catalog);
        let tx = self.completions_tx.clone();
        let task_request = request.clone();
        let task_token = token.clone();
        let task = tokio::spawn(async move {
            let outcome = catalog.search(&task_request, &task_token).await;
            // The session may already be gone.
            let _ = tx.send(Completion { id, outcome });
        });

        info!(request_id = id.0, query = %request.query, page = request.page, "Search issued");

        self.state.loading = true;
        self.state.error = None;
        self.in_flight = Some(InFlight {
            id,
            request: request.clone(),
            token,
            task,
        });

        request
    }

    /// Cancel the current request, if any. Returns whether one was cancelled.
    fn cancel_in_flight(&mut self) -> bool {
        self.retired.retain(|task| !task.is_finished());

        match self.in_flight.take() {
            Some(flight) => {
                flight.token.cancel();
                debug!(request_id = flight.id.0, "Search cancelled");
                self.retired.push(flight.task);
                true
            }
            None => false,
        }
    }

    fn on_completion(&mut self, completion: Completion) -> SessionUpdate {
        // A pending debounce means newer input is waiting to be issued.
        let request = match &self.in_flight {
            Some(flight)
                if flight.id == completion.id
                    && !flight.token.is_cancelled()
                    && self.debounce_deadline.is_none() =>
            {
                flight.request.clone()
            }
            _ => {
                debug!(request_id = completion.id.0, "Stale search response discarded");
                return SessionUpdate::Discarded(completion.id);
            }
        };
        self.in_flight = None;

        match completion.outcome {
            Ok(page) => {
                let corrected_page = self.apply(page);
                SessionUpdate::Applied {
                    request,
                    corrected_page,
                }
            }
            Err(e) if e.is_cancelled() => {
                // Cancelled by the transport without us asking; nothing to show.
                self.state.loading = false;
                SessionUpdate::Discarded(completion.id)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(query = %request.query, page = request.page, error = %message, "Search failed");
                self.state.error = Some(message.clone());
                self.state.results.clear();
                self.state.pagination = None;
                self.state.loading = false;
                SessionUpdate::Failed(message)
            }
        }
    }

    fn apply(&mut self, page: SearchPage) -> Option<u32> {
        let info = page.pagination;
        info!(
            results = page.items.len(),
            page = info.current_page,
            last_visible_page = info.last_visible_page,
            total = info.total_items,
            "Search results applied"
        );

        self.state.results = page.items;
        self.state.pagination = Some(info);
        self.state.error = None;
        self.state.loading = false;

        self.reconcile_page(&info)
    }

    /// Adopt the server's page number. Display-only: never schedules a fetch.
    fn reconcile_page(&mut self, info: &PaginationInfo) -> Option<u32> {
        if info.current_page == self.state.page {
            return None;
        }
        info!(
            requested = self.state.page,
            server = info.current_page,
            "Page corrected by server"
        );
        self.state.page = info.current_page;
        Some(info.current_page)
    }
}

impl<C: Catalog> Drop for SearchSession<C> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fake::{anime, page, FakeCatalog};

    fn session(catalog: FakeCatalog) -> (SearchSession<FakeCatalog>, Arc<FakeCatalog>) {
        let catalog = Arc::new(catalog);
        (SearchSession::with_defaults(Arc::clone(&catalog)), catalog)
    }

    #[tokio::test(start_paused = true)]
    async fn test_keystrokes_within_window_coalesce_into_one_fetch() {
        let catalog = FakeCatalog::new();
        catalog.on_search("ani", 1, 10, Ok(page(vec![anime(1, "Anohana")], 1, 1)));
        let (mut session, catalog) = session(catalog);

        session.set_query("a");
        tokio::time::advance(Duration::from_millis(100)).await;
        session.set_query("an");
        tokio::time::advance(Duration::from_millis(100)).await;
        session.set_query("ani");

        let updates = session.run_until_idle().await;

        assert_eq!(catalog.search_calls(), vec![("ani".to_string(), 1)]);
        assert!(matches!(updates.last(), Some(SessionUpdate::Applied { .. })));
        assert_eq!(session.state().results[0].title, "Anohana");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_waits_for_debounce_window() {
        let catalog = FakeCatalog::new();
        catalog.on_search("bebop", 1, 0, Ok(page(vec![anime(1, "Cowboy Bebop")], 1, 1)));
        let (mut session, _catalog) = session(catalog);

        let start = Instant::now();
        session.set_query("bebop");
        let update = session.step().await;

        assert!(start.elapsed() >= DEFAULT_DEBOUNCE);
        assert_eq!(
            update,
            Some(SessionUpdate::Issued(PageRequest {
                query: "bebop".to_string(),
                page: 1,
                page_size: DEFAULT_PAGE_SIZE,
            }))
        );
        assert!(session.state().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_of_superseded_request_is_discarded() {
        // The transport ignores cancellation, so the old response really does arrive last.
        let catalog = FakeCatalog::uncooperative();
        catalog.on_search("one", 1, 500, Ok(page(vec![anime(1, "A")], 1, 3)));
        catalog.on_search("one", 2, 100, Ok(page(vec![anime(2, "B")], 2, 3)));
        let (mut session, _catalog) = session(catalog);

        session.set_query("one");
        assert!(matches!(session.step().await, Some(SessionUpdate::Issued(_))));
        session.set_page(2).unwrap();

        let updates = session.run_until_idle().await;
        assert!(matches!(updates.as_slice(), [SessionUpdate::Applied { .. }]));

        // Let request A resolve after B and make sure it changes nothing.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(matches!(session.step().await, Some(SessionUpdate::Discarded(_))));

        let state = session.state();
        assert_eq!(state.results[0].title, "B");
        assert_eq!(state.page, 2);
        assert_eq!(state.pagination.map(|p| p.current_page), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_response_of_superseded_request_is_discarded() {
        let catalog = FakeCatalog::uncooperative();
        catalog.on_search("one", 1, 100, Ok(page(vec![anime(1, "A")], 1, 3)));
        catalog.on_search("one", 2, 500, Ok(page(vec![anime(2, "B")], 2, 3)));
        let (mut session, _catalog) = session(catalog);

        session.set_query("one");
        session.step().await;
        session.set_page(2).unwrap();

        let updates = session.run_until_idle().await;

        assert!(matches!(updates[0], SessionUpdate::Discarded(_)));
        assert!(matches!(updates[1], SessionUpdate::Applied { .. }));
        assert_eq!(session.state().results[0].title, "B");
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_page_correction_does_not_refetch() {
        let catalog = FakeCatalog::new();
        catalog.on_search("naruto", 50, 10, Ok(page(vec![anime(20, "Naruto")], 5, 5)));
        let (mut session, catalog) = session(catalog);

        session.set_query("naruto");
        session.set_page(50).unwrap();
        let updates = session.run_until_idle().await;

        assert_eq!(session.state().page, 5);
        assert_eq!(catalog.search_calls(), vec![("naruto".to_string(), 50)]);
        assert!(session.is_idle());
        match &updates[..] {
            [SessionUpdate::Applied { corrected_page, .. }] => assert_eq!(*corrected_page, Some(5)),
            other => panic!("unexpected updates: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_query_keeps_results_and_fetches_nothing() {
        let catalog = FakeCatalog::new();
        catalog.on_search("naruto", 1, 10, Ok(page(vec![anime(20, "Naruto")], 1, 1)));
        let (mut session, catalog) = session(catalog);

        session.set_query("naruto");
        session.run_until_idle().await;

        session.set_query("");
        assert!(!session.has_pending_debounce());
        session.set_query("   ");
        assert!(session.run_until_idle().await.is_empty());

        assert_eq!(catalog.search_calls().len(), 1);
        assert_eq!(session.state().results.len(), 1);
        assert!(session.state().pagination.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_is_silent() {
        let catalog = FakeCatalog::new();
        catalog.on_search("first", 1, 10, Ok(page(vec![anime(1, "First")], 1, 1)));
        catalog.on_search("second", 1, 1_000, Ok(page(vec![anime(2, "Second")], 1, 1)));
        let (mut session, _catalog) = session(catalog);

        session.set_query("first");
        session.run_until_idle().await;

        session.set_query("second");
        session.step().await;
        assert!(session.state().loading);
        session.set_query("");

        // The cancelled request resolves with the cancellation signal; nothing changes.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(matches!(session.step().await, Some(SessionUpdate::Discarded(_))));

        let state = session.state();
        assert_eq!(state.error, None);
        assert!(!state.loading);
        assert_eq!(state.results[0].title, "First");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_failure_clears_results() {
        let catalog = FakeCatalog::new();
        catalog.on_search("ok", 1, 10, Ok(page(vec![anime(1, "Ok")], 1, 2)));
        catalog.on_search("ok", 2, 10, Err(CatalogError::RateLimited));
        let (mut session, _catalog) = session(catalog);

        session.set_query("ok");
        session.run_until_idle().await;
        session.set_page(2).unwrap();
        let updates = session.run_until_idle().await;

        let state = session.state();
        assert!(matches!(updates.as_slice(), [SessionUpdate::Failed(_)]));
        assert_eq!(state.error.as_deref(), Some(CatalogError::RateLimited.to_string().as_str()));
        assert!(state.results.is_empty());
        assert!(state.pagination.is_none());
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_request_clears_previous_error() {
        let catalog = FakeCatalog::new();
        catalog.on_search("bad", 1, 10, Err(CatalogError::RequestFailed("boom".to_string())));
        catalog.on_search("good", 1, 10, Ok(page(vec![anime(1, "Good")], 1, 1)));
        let (mut session, _catalog) = session(catalog);

        session.set_query("bad");
        session.run_until_idle().await;
        assert_eq!(session.state().error.as_deref(), Some("boom"));

        session.set_query("good");
        session.run_until_idle().await;
        assert_eq!(session.state().error, None);
        assert_eq!(session.state().results.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_change_resets_page() {
        let catalog = FakeCatalog::new();
        catalog.on_search("x", 3, 10, Ok(page(vec![anime(1, "X")], 3, 4)));
        catalog.on_search("y", 1, 10, Ok(page(vec![anime(2, "Y")], 1, 1)));
        let (mut session, catalog) = session(catalog);

        session.set_query("x");
        session.set_page(3).unwrap();
        session.run_until_idle().await;
        assert_eq!(session.state().page, 3);

        session.set_query("y");
        assert_eq!(session.state().page, 1);
        session.run_until_idle().await;

        assert_eq!(
            catalog.search_calls(),
            vec![("x".to_string(), 3), ("y".to_string(), 1)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_change_while_previous_page_in_flight_starts_at_page_one() {
        // The old response arrives inside the new query's debounce window.
        let catalog = FakeCatalog::uncooperative();
        catalog.on_search("x", 3, 10, Ok(page(vec![anime(1, "X")], 3, 4)));
        catalog.on_search("y", 1, 10, Ok(page(vec![anime(2, "Y")], 1, 1)));
        let (mut session, catalog) = session(catalog);

        session.set_query("x");
        session.set_page(3).unwrap();
        session.set_query("y");
        assert_eq!(session.current_request(), None);
        assert!(!session.state().loading);

        let updates = session.run_until_idle().await;

        assert!(matches!(updates[0], SessionUpdate::Discarded(_)));
        assert_eq!(
            catalog.search_calls(),
            vec![("x".to_string(), 3), ("y".to_string(), 1)]
        );
        let state = session.state();
        assert_eq!(state.page, 1);
        assert_eq!(state.results[0].title, "Y");
        assert_eq!(state.pagination.map(|p| p.current_page), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_change_cancels_in_flight_request() {
        let catalog = FakeCatalog::new();
        catalog.on_search("x", 2, 1_000, Ok(page(vec![anime(1, "X")], 2, 4)));
        catalog.on_search("y", 1, 10, Ok(page(vec![anime(2, "Y")], 1, 1)));
        let (mut session, catalog) = session(catalog);

        session.set_query("x");
        session.set_page(2).unwrap();
        session.set_query("y");

        let updates = session.run_until_idle().await;

        assert!(updates
            .iter()
            .all(|u| !matches!(u, SessionUpdate::Applied { request, .. } if request.query == "x")));
        assert_eq!(
            catalog.search_calls(),
            vec![("x".to_string(), 2), ("y".to_string(), 1)]
        );
        assert_eq!(session.state().page, 1);
        assert_eq!(session.state().results[0].title, "Y");
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_navigation_clamps_to_known_pages() {
        let catalog = FakeCatalog::new();
        catalog.on_search("x", 1, 10, Ok(page(vec![anime(1, "X1")], 1, 2)));
        catalog.on_search("x", 2, 10, Ok(page(vec![anime(2, "X2")], 2, 2)));
        let (mut session, catalog) = session(catalog);

        assert!(!session.prev_page());
        assert_eq!(session.set_page(0), Err(SessionError::InvalidPage(0)));

        session.set_query("x");
        session.run_until_idle().await;
        assert!(session.next_page());
        session.run_until_idle().await;
        assert!(!session.next_page());
        assert_eq!(catalog.search_calls().len(), 2);
        assert_eq!(session.state().results[0].title, "X2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_resets_everything() {
        let catalog = FakeCatalog::new();
        catalog.on_search("x", 1, 10, Ok(page(vec![anime(1, "X")], 1, 1)));
        catalog.on_search("z", 1, 1_000, Ok(page(vec![anime(9, "Z")], 1, 1)));
        let (mut session, _catalog) = session(catalog);

        session.set_query("x");
        session.run_until_idle().await;
        session.set_query("z");
        session.step().await;

        session.clear();
        assert!(session.is_idle());
        assert_eq!(*session.state(), SessionState::default());

        tokio::time::sleep(Duration::from_secs(2)).await;
        while session.step().await.is_some() {}
        assert_eq!(*session.state(), SessionState::default());
    }
}
