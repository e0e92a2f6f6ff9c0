//! Catalog served from a local JSON file.
//!
//! Useful for demos and offline development. The file holds one section per
//! media type:
//!
//! ```json
//! {
//!   "movie": {
//!     "items": [{ "id": 603, "title": "The Matrix", "kind": "movie" }],
//!     "genres": [{ "id": 28, "name": "Action" }]
//!   },
//!   "tv": { "items": [{ "id": 1396, "title": "Breaking Bad", "kind": "tv_show" }] }
//! }
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{CatalogError, CatalogPage, CatalogProvider, Listing};
use crate::media::{Genre, MediaItem, MediaType};
use crate::pipeline::{by_date, by_popularity, by_rating};

/// Fixture catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureConfig {
    /// Path to the JSON fixture.
    pub path: PathBuf,
    /// Items per served page (default: 20, like TMDB).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    20
}

#[derive(Debug, Default, Deserialize)]
struct FixtureSection {
    #[serde(default)]
    items: Vec<MediaItem>,
    #[serde(default)]
    genres: Vec<Genre>,
}

#[derive(Debug, Default, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    movie: FixtureSection,
    #[serde(default)]
    tv: FixtureSection,
}

/// Read-only catalog over a fixed item list.
///
/// Listings are arranged the way the remote catalog would: discover and
/// search by popularity, top rated by vote average, upcoming by date.
#[derive(Debug)]
pub struct FixtureCatalog {
    sections: HashMap<MediaType, FixtureSection>,
    page_size: usize,
}

impl FixtureCatalog {
    /// Load the fixture named by `config`.
    pub fn load(config: &FixtureConfig) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(&config.path).map_err(|e| {
            CatalogError::NotConfigured(format!(
                "Failed to read catalog fixture {:?}: {}",
                config.path, e
            ))
        })?;
        let catalog = Self::from_json(&raw, config.page_size)?;
        info!(
            "Loaded catalog fixture {:?}: movies={}, shows={}",
            config.path,
            catalog.item_count(MediaType::Movie),
            catalog.item_count(MediaType::Tv)
        );
        Ok(catalog)
    }

    pub fn from_json(raw: &str, page_size: usize) -> Result<Self, CatalogError> {
        let file: FixtureFile = serde_json::from_str(raw)
            .map_err(|e| CatalogError::ParseError(format!("catalog fixture: {}", e)))?;

        for (media_type, section) in [(MediaType::Movie, &file.movie), (MediaType::Tv, &file.tv)] {
            if let Some(item) = section.items.iter().find(|i| i.media_type() != media_type) {
                return Err(CatalogError::ParseError(format!(
                    "catalog fixture: item {} is not a {}",
                    item.id, media_type
                )));
            }
        }

        Ok(Self {
            sections: HashMap::from([(MediaType::Movie, file.movie), (MediaType::Tv, file.tv)]),
            page_size: page_size.max(1),
        })
    }

    pub fn item_count(&self, media_type: MediaType) -> usize {
        self.sections
            .get(&media_type)
            .map_or(0, |section| section.items.len())
    }

    fn arranged(&self, media_type: MediaType, listing: Listing) -> Vec<&MediaItem> {
        let Some(section) = self.sections.get(&media_type) else {
            return Vec::new();
        };

        let mut items: Vec<&MediaItem> = match listing {
            Listing::Search(filter) => section.items.iter().filter(|i| filter.matches(i)).collect(),
            _ => section.items.iter().collect(),
        };
        let order: fn(&MediaItem, &MediaItem) -> Ordering = match listing {
            Listing::Discover | Listing::Search(_) => by_popularity,
            Listing::TopRated => by_rating,
            Listing::Upcoming => by_date,
        };
        items.sort_by(|a, b| order(a, b));
        items
    }
}

#[async_trait]
impl CatalogProvider for FixtureCatalog {
    async fn page(
        &self,
        media_type: MediaType,
        listing: Listing,
        page: u32,
    ) -> Result<CatalogPage, CatalogError> {
        debug!(
            "Fixture listing: media_type={}, listing={}, page={}",
            media_type, listing, page
        );
        let arranged = self.arranged(media_type, listing);
        let total_results = arranged.len();
        let total_pages = total_results.div_ceil(self.page_size);

        // Past the last page is empty, not an error
        let start = (page.max(1) as usize - 1).saturating_mul(self.page_size);
        let items = arranged
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect();

        Ok(CatalogPage {
            items,
            page,
            total_pages: total_pages as u32,
            total_results: total_results as u32,
        })
    }

    async fn detail(&self, media_type: MediaType, id: u32) -> Result<MediaItem, CatalogError> {
        self.sections
            .get(&media_type)
            .and_then(|section| section.items.iter().find(|i| i.id == id))
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("/{}/{}", media_type.as_str(), id)))
    }

    async fn genres(&self, media_type: MediaType) -> Result<Vec<Genre>, CatalogError> {
        Ok(self
            .sections
            .get(&media_type)
            .map(|section| section.genres.clone())
            .unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
