//! Anime search library for browsing the Jikan API v4.
//!
//! This library provides a debounced, cancellable search session, a detail
//! view, a random picker and the local presentation helpers the terminal
//! frontend renders with.

pub mod api;
pub mod cancel;
pub mod catalog;
pub mod detail;
pub mod images;
pub mod presentation;
pub mod random;
pub mod session;

pub use api::{CatalogError, JikanClient, RateLimiter};
pub use cancel::CancellationToken;
pub use catalog::{recommendations, Catalog, PageRequest, SearchPage};
pub use detail::{DetailState, DetailView};
pub use images::{best_image_url, normalize_image_url};
pub use presentation::{ResultView, SortKey, ViewMode};
pub use random::{PickError, PickSettings, RandomPicker};
pub use session::{SearchSession, SessionError, SessionState, SessionUpdate};
