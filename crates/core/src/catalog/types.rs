//! Catalog request and response types.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::{MediaItem, MediaType};

/// Which remote listing a screen browses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Listing {
    /// General discovery, ordered by the catalog's own popularity ranking.
    #[default]
    Discover,
    TopRated,
    /// Upcoming releases (movies) or currently airing shows (TV).
    Upcoming,
    /// Discovery narrowed on the catalog side by genre, year and rating.
    Search(DiscoverFilter),
}

impl Listing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Listing::Discover => "discover",
            Listing::TopRated => "top_rated",
            Listing::Upcoming => "upcoming",
            Listing::Search(_) => "search",
        }
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Listing::Search(filter) if !filter.is_empty() => write!(f, "search({})", filter),
            other => f.write_str(other.as_str()),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown listing: {0}")]
pub struct UnknownListing(pub String);

impl FromStr for Listing {
    type Err = UnknownListing;

    /// Parse a listing name. `search` parses to an empty [`DiscoverFilter`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "discover" => Ok(Listing::Discover),
            "top_rated" | "toprated" => Ok(Listing::TopRated),
            "upcoming" | "on_the_air" => Ok(Listing::Upcoming),
            "search" | "advanced_search" => Ok(Listing::Search(DiscoverFilter::default())),
            other => Err(UnknownListing(other.to_string())),
        }
    }
}

/// Lowest release year accepted by [`DiscoverFilter`].
pub const MIN_DISCOVER_YEAR: i32 = 1874;

/// Highest vote average a catalog reports.
pub const MAX_RATING: u8 = 10;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidDiscoverFilter {
    #[error("Invalid year {0}: expected 1874-9999")]
    Year(i32),

    #[error("Invalid minimum rating {0}: expected 0-10")]
    Rating(u8),
}

/// Catalog-side criteria for [`Listing::Search`]. Unset fields match everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DiscoverFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre_id: Option<u32>,
    /// Release year for movies, first air year for shows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Lowest accepted vote average, whole points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<u8>,
}

impl DiscoverFilter {
    pub fn new(
        genre_id: Option<u32>,
        year: Option<i32>,
        min_rating: Option<u8>,
    ) -> Result<Self, InvalidDiscoverFilter> {
        if let Some(year) = year {
            if !(MIN_DISCOVER_YEAR..=9999).contains(&year) {
                return Err(InvalidDiscoverFilter::Year(year));
            }
        }
        if let Some(rating) = min_rating {
            if rating > MAX_RATING {
                return Err(InvalidDiscoverFilter::Rating(rating));
            }
        }
        Ok(Self {
            genre_id: genre_id.filter(|&g| g != 0),
            year,
            min_rating,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.genre_id.is_none() && self.year.is_none() && self.min_rating.is_none()
    }

    /// Local evaluation of the same criteria the catalog applies remotely.
    pub fn matches(&self, item: &MediaItem) -> bool {
        self.genre_id.is_none_or(|g| item.genre_ids.contains(&g))
            && self.year.is_none_or(|y| item.year() == Some(y))
            && self
                .min_rating
                .is_none_or(|r| item.vote_average >= f32::from(r))
    }
}

impl fmt::Display for DiscoverFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(genre) = self.genre_id {
            parts.push(format!("genre={}", genre));
        }
        if let Some(year) = self.year {
            parts.push(format!("year={}", year));
        }
        if let Some(rating) = self.min_rating {
            parts.push(format!("rating>={}", rating));
        }
        f.write_str(&parts.join(","))
    }
}

/// One page of catalog results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    pub items: Vec<MediaItem>,
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u32,
}

/// Error returned when a page range string is malformed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid page range '{0}': expected N or A-B with 1 <= A <= B <= 500")]
pub struct InvalidPageRange(pub String);

/// Highest page number the catalog serves.
pub const MAX_PAGE: u32 = 500;

/// Ordered list of remote page numbers to fetch.
///
/// Page numbers are 1-based and at most [`MAX_PAGE`]. Out-of-range and
/// repeated pages are dropped, keeping the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PageRange(Vec<u32>);

impl PageRange {
    pub fn new(pages: impl IntoIterator<Item = u32>) -> Self {
        let mut seen = HashSet::new();
        Self(
            pages
                .into_iter()
                .filter(|&p| (1..=MAX_PAGE).contains(&p) && seen.insert(p))
                .collect(),
        )
    }

    /// Pages `1..=count`, capped at [`MAX_PAGE`].
    pub fn first(count: u32) -> Self {
        Self::new(1..=count.min(MAX_PAGE))
    }

    pub fn pages(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for PageRange {
    type Err = InvalidPageRange;

    /// Parse `N` (pages 1..=N) or `A-B` (pages A..=B).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidPageRange(s.to_string());
        let trimmed = s.trim();

        match trimmed.split_once('-') {
            Some((start, end)) => {
                let start: u32 = start.trim().parse().map_err(|_| invalid())?;
                let end: u32 = end.trim().parse().map_err(|_| invalid())?;
                if start == 0 || start > end || end > MAX_PAGE {
                    return Err(invalid());
                }
                Ok(Self::new(start..=end))
            }
            None => {
                let count: u32 = trimmed.parse().map_err(|_| invalid())?;
                if count == 0 || count > MAX_PAGE {
                    return Err(invalid());
                }
                Ok(Self::first(count))
            }
        }
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.0.first(), self.0.last()) {
            (Some(first), Some(last)) if first == last => write!(f, "{}", first),
            (Some(first), Some(last)) => write!(f, "{}-{}", first, last),
            _ => f.write_str("none"),
        }
    }
}

/// Identifies one aggregated collection. A change of key means a new collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey {
    pub media_type: MediaType,
    pub listing: Listing,
    pub pages: PageRange,
}

impl QueryKey {
    pub fn new(media_type: MediaType, listing: Listing, pages: PageRange) -> Self {
        Self {
            media_type,
            listing,
            pages,
        }
    }

    /// Discover listing, pages `1..=count`.
    pub fn discover(media_type: MediaType, count: u32) -> Self {
        Self::new(media_type, Listing::Discover, PageRange::first(count))
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}[{}]", self.media_type, self.listing, self.pages)
    }
}
