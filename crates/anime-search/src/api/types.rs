//! Jikan API v4 response types.
//!
//! These types represent the JSON responses from the Jikan API and their
//! mapping into the internal records from `shared::models`. Everything the
//! catalog may omit or send as `null` is optional here.

use serde::{Deserialize, Serialize};
use shared::{
    AiringRange, AnimeDetail, AnimeSummary, Genre, ImageUrls, ImageVariants, PaginationInfo,
    Studio,
};

/// Generic pagination wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Single-record wrapper; `data` is `null` when the record doesn't exist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: Option<T>,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub last_visible_page: u32,
    pub has_next_page: bool,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub items: Option<PaginationItems>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationItems {
    pub count: u32,
    pub total: u32,
    pub per_page: u32,
}

impl Pagination {
    /// Convert to server-truth pagination.
    ///
    /// `requested_page` and `page_size` fill in whatever the server left out.
    pub fn into_info(self, requested_page: u32, page_size: u32) -> PaginationInfo {
        let (count, total, per_page) = match self.items {
            Some(items) => (items.count, items.total, items.per_page),
            None => (0, 0, page_size),
        };

        PaginationInfo {
            current_page: self.current_page.unwrap_or(requested_page),
            last_visible_page: self.last_visible_page,
            has_next_page: self.has_next_page,
            items_per_page: per_page,
            total_items: total,
            current_page_items: count,
        }
    }
}

/// Anime entry as returned by search, top list and lookup endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeEntry {
    pub mal_id: u32,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub images: Option<AnimeImages>,

    // Titles
    pub title: String,
    #[serde(default)]
    pub title_english: Option<String>,
    #[serde(default)]
    pub title_japanese: Option<String>,
    #[serde(default)]
    pub title_synonyms: Vec<String>,

    // Type and status
    #[serde(rename = "type", default)]
    pub anime_type: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,

    // Dates
    #[serde(default)]
    pub aired: Option<Aired>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,

    // Scores and rankings
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub scored_by: Option<u32>,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub members: Option<u32>,

    // Synopsis
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub background: Option<String>,

    // Season
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,

    // Producers and studios
    #[serde(default)]
    pub producers: Vec<MalEntity>,
    #[serde(default)]
    pub studios: Vec<MalEntity>,

    // Genres, themes, demographics
    #[serde(default)]
    pub genres: Vec<MalEntity>,
    #[serde(default)]
    pub explicit_genres: Vec<MalEntity>,
    #[serde(default)]
    pub themes: Vec<MalEntity>,
    #[serde(default)]
    pub demographics: Vec<MalEntity>,
}

/// Anime images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeImages {
    #[serde(default)]
    pub jpg: Option<ImageSet>,
    #[serde(default)]
    pub webp: Option<ImageSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSet {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub small_image_url: Option<String>,
    #[serde(default)]
    pub large_image_url: Option<String>,
}

/// Aired dates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aired {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub string: Option<String>,
}

/// MAL entity (genre, studio, producer, etc.)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MalEntity {
    pub mal_id: u32,
    #[serde(rename = "type", default)]
    pub entity_type: Option<String>,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Error response from Jikan API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JikanError {
    pub status: u16,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}

impl From<ImageSet> for ImageVariants {
    fn from(set: ImageSet) -> Self {
        Self {
            image_url: set.image_url,
            small_image_url: set.small_image_url,
            large_image_url: set.large_image_url,
        }
    }
}

fn genres(entities: Vec<MalEntity>) -> Vec<Genre> {
    entities
        .into_iter()
        .map(|e| Genre { id: e.mal_id, name: e.name })
        .collect()
}

fn studios(entities: Vec<MalEntity>) -> Vec<Studio> {
    entities
        .into_iter()
        .map(|e| Studio { id: e.mal_id, name: e.name })
        .collect()
}

impl AnimeEntry {
    /// Split into the list-view record and the remaining detail-only fields
    pub fn into_detail(self) -> AnimeDetail {
        let images = self
            .images
            .map(|i| ImageUrls {
                jpg: i.jpg.map(Into::into),
                webp: i.webp.map(Into::into),
            })
            .unwrap_or_default();

        let aired = self
            .aired
            .map(|a| AiringRange::from_timestamps(a.from.as_deref(), a.to.as_deref(), a.string))
            .unwrap_or_default();

        AnimeDetail {
            summary: AnimeSummary {
                id: self.mal_id,
                url: self.url,
                title: self.title,
                title_english: self.title_english,
                title_japanese: self.title_japanese,
                title_synonyms: self.title_synonyms,
                score: self.score,
                year: self.year,
                episodes: self.episodes,
                synopsis: self.synopsis,
                aired,
                genres: genres(self.genres),
                explicit_genres: genres(self.explicit_genres),
                studios: studios(self.studios),
                images,
            },
            anime_type: self.anime_type,
            source: self.source,
            status: self.status,
            duration: self.duration,
            rating: self.rating,
            season: self.season,
            rank: self.rank,
            popularity: self.popularity,
            members: self.members,
            scored_by: self.scored_by,
            background: self.background,
            themes: genres(self.themes),
            demographics: genres(self.demographics),
            producers: studios(self.producers),
        }
    }
}

impl From<AnimeEntry> for AnimeSummary {
    fn from(entry: AnimeEntry) -> Self {
        entry.into_detail().summary
    }
}
