//! Media records shared by every pipeline stage.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Namespace of a media id. Ids are only unique within one media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    /// Every media type, in a fixed order.
    pub const ALL: [MediaType; 2] = [MediaType::Movie, MediaType::Tv];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a media type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown media type: {0}")]
pub struct UnknownMediaType(pub String);

impl FromStr for MediaType {
    type Err = UnknownMediaType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" | "movies" => Ok(MediaType::Movie),
            "tv" | "tv_show" | "tv_shows" | "show" | "shows" => Ok(MediaType::Tv),
            other => Err(UnknownMediaType(other.to_string())),
        }
    }
}

/// Variant-specific attributes of a media item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaKind {
    Movie {
        /// Box office revenue in USD. Only present on full detail records.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        revenue: Option<u64>,
    },
    TvShow,
}

/// A movie or TV show as returned by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Catalog id, unique within the item's media type.
    pub id: u32,
    /// Movie title or show name. `None` marks a malformed record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub genre_ids: BTreeSet<u32>,
    /// Release date for movies, first air date for shows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,
    /// Average vote (0-10).
    #[serde(default)]
    pub vote_average: f32,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(flatten)]
    pub kind: MediaKind,
}

impl MediaItem {
    /// Create a movie with the given id and title and empty attributes.
    pub fn movie(id: u32, title: impl Into<String>) -> Self {
        Self::bare(id, Some(title.into()), MediaKind::Movie { revenue: None })
    }

    /// Create a TV show with the given id and name and empty attributes.
    pub fn tv(id: u32, name: impl Into<String>) -> Self {
        Self::bare(id, Some(name.into()), MediaKind::TvShow)
    }

    fn bare(id: u32, title: Option<String>, kind: MediaKind) -> Self {
        Self {
            id,
            title,
            genre_ids: BTreeSet::new(),
            release_date: None,
            vote_average: 0.0,
            popularity: 0.0,
            poster_path: None,
            overview: None,
            kind,
        }
    }

    pub fn with_genres(mut self, genre_ids: impl IntoIterator<Item = u32>) -> Self {
        self.genre_ids = genre_ids.into_iter().collect();
        self
    }

    pub fn with_release_date(mut self, date: NaiveDate) -> Self {
        self.release_date = Some(date);
        self
    }

    pub fn with_vote_average(mut self, vote_average: f32) -> Self {
        self.vote_average = vote_average;
        self
    }

    pub fn with_popularity(mut self, popularity: f64) -> Self {
        self.popularity = popularity;
        self
    }

    /// Set the revenue. Ignored for TV shows.
    pub fn with_revenue(mut self, revenue: u64) -> Self {
        if let MediaKind::Movie { revenue: r } = &mut self.kind {
            *r = Some(revenue);
        }
        self
    }

    pub fn without_title(mut self) -> Self {
        self.title = None;
        self
    }

    pub fn media_type(&self) -> MediaType {
        match self.kind {
            MediaKind::Movie { .. } => MediaType::Movie,
            MediaKind::TvShow => MediaType::Tv,
        }
    }

    /// Revenue, for movies that carry one.
    pub fn revenue(&self) -> Option<u64> {
        match self.kind {
            MediaKind::Movie { revenue } => revenue,
            MediaKind::TvShow => None,
        }
    }

    /// Title if present and not blank.
    pub fn indexable_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn year(&self) -> Option<i32> {
        self.release_date.map(|d| d.year())
    }
}

/// A genre from the catalog's genre list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

/// Ordered, id-deduplicated sequence of media items.
///
/// The first occurrence of an id wins; later duplicates are dropped, so
/// insertion order is the order of first appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    items: Vec<MediaItem>,
    seen: HashSet<u32>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge pages in order, keeping the first occurrence of every id.
    pub fn from_pages<I, P>(pages: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: IntoIterator<Item = MediaItem>,
    {
        let mut collection = Self::new();
        for page in pages {
            collection.extend(page);
        }
        collection
    }

    /// Append an item. Returns false (and drops the item) if its id is already present.
    pub fn push(&mut self, item: MediaItem) -> bool {
        if !self.seen.insert(item.id) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MediaItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.seen.contains(&id)
    }

    pub fn get(&self, id: u32) -> Option<&MediaItem> {
        if !self.contains(id) {
            return None;
        }
        self.items.iter().find(|item| item.id == id)
    }

    pub fn into_items(self) -> Vec<MediaItem> {
        self.items
    }
}

impl Extend<MediaItem> for Collection {
    fn extend<T: IntoIterator<Item = MediaItem>>(&mut self, iter: T) {
        for item in iter {
            self.push(item);
        }
    }
}

impl FromIterator<MediaItem> for Collection {
    fn from_iter<T: IntoIterator<Item = MediaItem>>(iter: T) -> Self {
        let mut collection = Self::new();
        collection.extend(iter);
        collection
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a MediaItem;
    type IntoIter = std::slice::Iter<'a, MediaItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
