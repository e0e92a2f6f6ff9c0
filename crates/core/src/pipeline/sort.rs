//! Sort modes and their comparators.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::{Collection, MediaItem};

/// How a screen orders its filtered items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Keep the incoming order.
    #[default]
    None,
    /// Newest release first.
    Date,
    /// Highest vote average first.
    Rating,
    Popularity,
    /// Highest box office first. Movies only.
    Earnings,
}

impl SortMode {
    pub const ALL: [SortMode; 5] = [
        SortMode::None,
        SortMode::Date,
        SortMode::Rating,
        SortMode::Popularity,
        SortMode::Earnings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::None => "none",
            SortMode::Date => "date",
            SortMode::Rating => "rating",
            SortMode::Popularity => "popularity",
            SortMode::Earnings => "earnings",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown sort mode: {0}")]
pub struct UnknownSortMode(pub String);

impl FromStr for SortMode {
    type Err = UnknownSortMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(SortMode::None),
            "date" | "release_date" => Ok(SortMode::Date),
            "rating" | "vote_average" => Ok(SortMode::Rating),
            "popularity" => Ok(SortMode::Popularity),
            "earnings" | "revenue" => Ok(SortMode::Earnings),
            other => Err(UnknownSortMode(other.to_string())),
        }
    }
}

/// Total order over items. `Less` sorts first.
pub type Comparator = fn(&MediaItem, &MediaItem) -> Ordering;

/// Newest first, undated last.
pub fn by_date(a: &MediaItem, b: &MediaItem) -> Ordering {
    match (a.release_date, b.release_date) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn by_rating(a: &MediaItem, b: &MediaItem) -> Ordering {
    b.vote_average.total_cmp(&a.vote_average)
}

pub fn by_popularity(a: &MediaItem, b: &MediaItem) -> Ordering {
    b.popularity.total_cmp(&a.popularity)
}

/// Highest revenue first. Shows and movies without revenue last.
pub fn by_earnings(a: &MediaItem, b: &MediaItem) -> Ordering {
    match (a.revenue(), b.revenue()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Comparator registry keyed by sort mode.
///
/// Sorting is stable and never adds or drops items. [`SortMode::None`] has no
/// comparator unless one is registered.
#[derive(Debug, Clone)]
pub struct SortStage {
    comparators: HashMap<SortMode, Comparator>,
}

impl Default for SortStage {
    fn default() -> Self {
        let mut comparators: HashMap<SortMode, Comparator> = HashMap::new();
        comparators.insert(SortMode::Date, by_date);
        comparators.insert(SortMode::Rating, by_rating);
        comparators.insert(SortMode::Popularity, by_popularity);
        comparators.insert(SortMode::Earnings, by_earnings);
        Self { comparators }
    }
}

impl SortStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the comparator for `mode`.
    pub fn with_comparator(mut self, mode: SortMode, comparator: Comparator) -> Self {
        self.comparators.insert(mode, comparator);
        self
    }

    pub fn comparator(&self, mode: SortMode) -> Option<Comparator> {
        self.comparators.get(&mode).copied()
    }

    pub fn sort(&self, items: &mut [&MediaItem], mode: SortMode) {
        self.sort_with(items, mode, |item| *item);
    }

    /// Sort collection positions by the items they point at.
    pub fn sort_positions(&self, collection: &Collection, positions: &mut [usize], mode: SortMode) {
        let items = collection.items();
        self.sort_with(positions, mode, |&position| &items[position]);
    }

    fn sort_with<'a, T, F>(&self, values: &mut [T], mode: SortMode, item: F)
    where
        F: Fn(&T) -> &'a MediaItem,
    {
        if let Some(compare) = self.comparator(mode) {
            values.sort_by(|a, b| compare(item(a), item(b)));
        }
    }
}
