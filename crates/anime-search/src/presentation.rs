//! Result presentation: genre filter, sort order, view mode and the small
//! derived facts the result list shows (genre choices, title suggestions,
//! "showing X to Y of Z").
//!
//! Every function here borrows its input and returns a fresh value, so the
//! session's result set is never reordered in place.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use shared::{AnimeSummary, PaginationInfo};

/// Maximum number of title suggestions
pub const MAX_SUGGESTIONS: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    #[default]
    RatingHigh,
    RatingLow,
    NameAsc,
    NameDesc,
    Newest,
    Oldest,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::RatingHigh,
        SortKey::RatingLow,
        SortKey::NameAsc,
        SortKey::NameDesc,
        SortKey::Newest,
        SortKey::Oldest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::RatingHigh => "rating-high",
            SortKey::RatingLow => "rating-low",
            SortKey::NameAsc => "name-az",
            SortKey::NameDesc => "name-za",
            SortKey::Newest => "newest",
            SortKey::Oldest => "oldest",
        }
    }

    fn compare(&self, a: &AnimeSummary, b: &AnimeSummary) -> Ordering {
        let score = |x: &AnimeSummary| x.score.unwrap_or(0.0);
        match self {
            SortKey::RatingHigh => score(b).total_cmp(&score(a)),
            SortKey::RatingLow => score(a).total_cmp(&score(b)),
            SortKey::NameAsc => compare_titles(&a.title, &b.title),
            SortKey::NameDesc => compare_titles(&b.title, &a.title),
            SortKey::Newest => b.year.unwrap_or(0).cmp(&a.year.unwrap_or(0)),
            SortKey::Oldest => a.year.unwrap_or(9999).cmp(&b.year.unwrap_or(9999)),
        }
    }
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let valid: Vec<&str> = SortKey::ALL.iter().map(SortKey::as_str).collect();
                format!("unknown sort key '{}', expected one of: {}", s, valid.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grid" => Ok(ViewMode::Grid),
            "list" => Ok(ViewMode::List),
            other => Err(format!("unknown view mode '{other}', expected grid or list")),
        }
    }
}

/// Local filter, sort and view choices layered over the server's results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultView {
    pub genres: BTreeSet<String>,
    pub sort: SortKey,
    pub view_mode: ViewMode,
}

impl ResultView {
    /// Toggle a genre in the selection
    pub fn toggle_genre(&mut self, genre: &str) {
        if !self.genres.remove(genre) {
            self.genres.insert(genre.to_string());
        }
    }

    /// Drop the genre selection and restore the default sort
    pub fn reset_filters(&mut self) {
        self.genres.clear();
        self.sort = SortKey::default();
    }

    /// Keep items with any selected genre, then sort. The input is untouched.
    pub fn apply<'a>(&self, items: &'a [AnimeSummary]) -> Vec<&'a AnimeSummary> {
        let mut view: Vec<&AnimeSummary> = items
            .iter()
            .filter(|anime| {
                self.genres.is_empty()
                    || anime.genres.iter().any(|g| self.genres.contains(&g.name))
            })
            .collect();

        view.sort_by(|a, b| self.sort.compare(a, b));
        view
    }
}

/// Sorted, de-duplicated genre names across the result set
pub fn available_genres(items: &[AnimeSummary]) -> Vec<String> {
    items
        .iter()
        .flat_map(|anime| anime.genres.iter().map(|g| g.name.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Titles containing `text` (case-insensitive), at most [`MAX_SUGGESTIONS`]
pub fn title_suggestions<'a>(items: &'a [AnimeSummary], text: &str) -> Vec<&'a str> {
    if text.is_empty() {
        return Vec::new();
    }
    let needle = text.to_lowercase();

    items
        .iter()
        .flat_map(AnimeSummary::all_titles)
        .filter(|title| title.to_lowercase().contains(&needle))
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// Range of items on the current page, 1-based and inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
    pub total: u32,
}

impl PageRange {
    pub fn from_pagination(info: &PaginationInfo) -> Self {
        if info.total_items == 0 {
            return Self {
                start: 0,
                end: 0,
                total: 0,
            };
        }

        let start = info
            .current_page
            .saturating_sub(1)
            .saturating_mul(info.items_per_page)
            .saturating_add(1);
        let end = start
            .saturating_add(info.current_page_items)
            .saturating_sub(1)
            .min(info.total_items);

        Self {
            start,
            end,
            total: info.total_items,
        }
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Showing {} to {} of {} results", self.start, self.end, self.total)
    }
}

/// Pagination controls are only worth showing with more than one page
pub fn shows_pagination(info: &PaginationInfo) -> bool {
    info.last_visible_page > 1
}
