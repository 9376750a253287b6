//! Detail view: fetch and hold one title by id.

use std::sync::Arc;

use shared::AnimeDetail;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DetailState {
    #[default]
    Idle,
    Loading(u32),
    Loaded(AnimeDetail),
    /// The fetch completed without error but the catalog has no such title
    NotFound(u32),
    Failed { id: u32, message: String },
}

impl DetailState {
    /// The id this state is about, if any
    pub fn id(&self) -> Option<u32> {
        match self {
            DetailState::Idle => None,
            DetailState::Loading(id) | DetailState::NotFound(id) => Some(*id),
            DetailState::Loaded(detail) => Some(detail.summary.id),
            DetailState::Failed { id, .. } => Some(*id),
        }
    }
}

pub struct DetailView<C: Catalog> {
    catalog: Arc<C>,
    state: DetailState,
}

impl<C: Catalog> DetailView<C> {
    pub fn new(catalog: Arc<C>) -> Self {
        Self {
            catalog,
            state: DetailState::Idle,
        }
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    /// Show title `id`, fetching it unless it is already loaded.
    ///
    /// A `Loading` state left behind by a dropped `open` future is fetched
    /// again. Returns whether a fetch was made.
    pub async fn open(&mut self, id: u32) -> bool {
        if matches!(&self.state, DetailState::Loaded(detail) if detail.summary.id == id) {
            debug!(mal_id = id, "Detail already loaded, skipping fetch");
            return false;
        }

        self.state = DetailState::Loading(id);
        self.state = match self.catalog.get_by_id(id).await {
            Ok(Some(detail)) => {
                info!(mal_id = id, title = %detail.summary.title, "Detail loaded");
                DetailState::Loaded(detail)
            }
            Ok(None) => {
                info!(mal_id = id, "Anime not found");
                DetailState::NotFound(id)
            }
            Err(e) => {
                warn!(mal_id = id, error = %e, "Failed to fetch anime details");
                DetailState::Failed {
                    id,
                    message: e.to_string(),
                }
            }
        };
        true
    }

    /// Leave the detail view
    pub fn close(&mut self) {
        self.state = DetailState::Idle;
    }
}
