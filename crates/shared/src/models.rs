//! Data models for the project.
//!
//! These are the internal record shapes the search session, presentation
//! and detail view work with. Wire types from the catalog are mapped into
//! them at the client boundary.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// A named genre tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

/// A studio credited on a title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Studio {
    pub id: u32,
    pub name: String,
}

/// One image format in three sizes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageVariants {
    pub image_url: Option<String>,
    pub small_image_url: Option<String>,
    pub large_image_url: Option<String>,
}

/// All image URLs reported for a title
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrls {
    pub jpg: Option<ImageVariants>,
    pub webp: Option<ImageVariants>,
}

/// Airing date range
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiringRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Human-readable range as reported by the catalog, e.g. "Oct 2, 2009 to Mar 26, 2010"
    pub display: Option<String>,
}

impl AiringRange {
    /// Build a range from RFC 3339 timestamps; unparsable values become `None`
    pub fn from_timestamps(from: Option<&str>, to: Option<&str>, display: Option<String>) -> Self {
        Self {
            from: from.and_then(parse_date),
            to: to.and_then(parse_date),
            display,
        }
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok())
}

/// Anime record as shown in result lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeSummary {
    pub id: u32,
    pub url: Option<String>,

    // Titles
    pub title: String,
    pub title_english: Option<String>,
    pub title_japanese: Option<String>,
    pub title_synonyms: Vec<String>,

    pub score: Option<f64>,
    pub year: Option<i32>,
    pub episodes: Option<u32>,
    pub synopsis: Option<String>,
    pub aired: AiringRange,

    // Classifications
    pub genres: Vec<Genre>,
    pub explicit_genres: Vec<Genre>,
    pub studios: Vec<Studio>,

    pub images: ImageUrls,
}

impl AnimeSummary {
    /// Every known title, main title first
    pub fn all_titles(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.title.as_str())
            .chain(self.title_english.as_deref())
            .chain(self.title_japanese.as_deref())
            .chain(self.title_synonyms.iter().map(String::as_str))
    }

    /// Whether the title carries the named tag in either genre list (case-insensitive)
    pub fn has_genre_tag(&self, name: &str) -> bool {
        self.genres
            .iter()
            .chain(self.explicit_genres.iter())
            .any(|g| g.name.eq_ignore_ascii_case(name))
    }
}

/// Full anime record for the detail view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeDetail {
    pub summary: AnimeSummary,

    pub anime_type: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    pub duration: Option<String>,
    pub rating: Option<String>,
    pub season: Option<String>,

    pub rank: Option<u32>,
    pub popularity: Option<u32>,
    pub members: Option<u32>,
    pub scored_by: Option<u32>,

    pub background: Option<String>,
    pub themes: Vec<Genre>,
    pub demographics: Vec<Genre>,
    pub producers: Vec<Studio>,
}

/// Server-reported pagination facts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub current_page: u32,
    pub last_visible_page: u32,
    pub has_next_page: bool,
    pub items_per_page: u32,
    pub total_items: u32,
    pub current_page_items: u32,
}
