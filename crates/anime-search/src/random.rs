//! Pick one random title from the top list.
//!
//! A pick lands on a random top-list page, drops titles tagged with the
//! excluded genre and chooses among the rest, falling back to page 1 once.
//! Picks throttle themselves: a second pick inside the minimum interval
//! fails without touching the network, and every catalog call is preceded
//! by a short pause to stay under the catalog's request ceiling.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use shared::config::RandomConfig;
use shared::AnimeSummary;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::api::CatalogError;
use crate::cancel::CancellationToken;
use crate::catalog::Catalog;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickError {
    #[error("Please wait {} ms before picking again.", .retry_in.as_millis())]
    TooSoon { retry_in: Duration },

    #[error("No suitable anime found. Please try again.")]
    NoSuitableItem,

    #[error("Rate limit exceeded. Please wait a moment before trying again.")]
    RateLimited,

    #[error(transparent)]
    Catalog(CatalogError),
}

impl From<CatalogError> for PickError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::RateLimited => PickError::RateLimited,
            other => PickError::Catalog(other),
        }
    }
}

/// Random pick settings
#[derive(Debug, Clone)]
pub struct PickSettings {
    pub min_interval: Duration,
    pub call_delay: Duration,
    pub max_page: u32,
    pub page_size: u32,
    pub excluded_genre: String,
}

impl Default for PickSettings {
    fn default() -> Self {
        Self::from(&RandomConfig::default())
    }
}

impl From<&RandomConfig> for PickSettings {
    fn from(config: &RandomConfig) -> Self {
        Self {
            min_interval: Duration::from_millis(config.min_interval_ms),
            call_delay: Duration::from_millis(config.call_delay_ms),
            max_page: config.max_page.max(1),
            page_size: config.page_size.max(1),
            excluded_genre: config.excluded_genre.clone(),
        }
    }
}

pub struct RandomPicker<C: Catalog> {
    catalog: Arc<C>,
    settings: PickSettings,
    rng: StdRng,
    last_pick: Option<Instant>,
}

impl<C: Catalog> RandomPicker<C> {
    pub fn new(catalog: Arc<C>, settings: PickSettings) -> Self {
        Self::with_rng(catalog, settings, StdRng::from_entropy())
    }

    /// Use a caller-provided generator, e.g. a seeded one
    pub fn with_rng(catalog: Arc<C>, settings: PickSettings, rng: StdRng) -> Self {
        Self {
            catalog,
            settings,
            rng,
            last_pick: None,
        }
    }

    pub async fn pick(&mut self) -> Result<AnimeSummary, PickError> {
        let now = Instant::now();
        if let Some(last) = self.last_pick {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.settings.min_interval {
                let retry_in = self.settings.min_interval - elapsed;
                debug!(retry_in_ms = retry_in.as_millis(), "Random pick throttled");
                return Err(PickError::TooSoon { retry_in });
            }
        }
        self.last_pick = Some(now);

        let page = self.rng.gen_range(1..=self.settings.max_page);
        if let Some(anime) = self.pick_from_page(page).await? {
            return Ok(anime);
        }

        if page != 1 {
            debug!(page, "No eligible titles, falling back to page 1");
            if let Some(anime) = self.pick_from_page(1).await? {
                return Ok(anime);
            }
        }

        Err(PickError::NoSuitableItem)
    }

    async fn pick_from_page(&mut self, page: u32) -> Result<Option<AnimeSummary>, PickError> {
        sleep(self.settings.call_delay).await;

        let result = self
            .catalog
            .top_list(self.settings.page_size, page, &CancellationToken::new())
            .await?;

        let excluded = self.settings.excluded_genre.as_str();
        let eligible: Vec<AnimeSummary> = result
            .items
            .into_iter()
            .filter(|anime| !anime.has_genre_tag(excluded))
            .collect();

        let choice = eligible.choose(&mut self.rng).cloned();
        if let Some(anime) = &choice {
            info!(page, mal_id = anime.id, title = %anime.title, "Random pick");
        }
        Ok(choice)
    }
}
