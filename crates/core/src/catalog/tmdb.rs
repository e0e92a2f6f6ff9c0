//! TMDB (The Movie Database) catalog provider.
//!
//! TMDB requires an API key for access.
//! Rate limits are generous (around 40 requests per second).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CatalogError, CatalogPage, CatalogProvider, DiscoverFilter, Listing};
use crate::media::{Genre, MediaItem, MediaKind, MediaType};
use crate::metrics::{CATALOG_REQUESTS, CATALOG_REQUEST_DURATION};

/// TMDB catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    /// TMDB API key (required).
    pub api_key: String,
    /// Base URL (default: https://api.themoviedb.org/3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Response language (default: en-US).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

/// TMDB catalog client.
pub struct TmdbCatalog {
    client: Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl TmdbCatalog {
    /// Create a new TMDB client.
    pub fn new(config: TmdbConfig) -> Result<Self, CatalogError> {
        if config.api_key.is_empty() {
            return Err(CatalogError::NotConfigured(
                "TMDB API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| "https://api.themoviedb.org/3".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
            language: config.language.unwrap_or_else(|| "en-US".to_string()),
        })
    }

    fn listing_path(media_type: MediaType, listing: Listing) -> &'static str {
        match (media_type, listing) {
            (MediaType::Movie, Listing::Discover | Listing::Search(_)) => "/discover/movie",
            (MediaType::Tv, Listing::Discover | Listing::Search(_)) => "/discover/tv",
            (MediaType::Movie, Listing::TopRated) => "/movie/top_rated",
            (MediaType::Tv, Listing::TopRated) => "/tv/top_rated",
            (MediaType::Movie, Listing::Upcoming) => "/movie/upcoming",
            (MediaType::Tv, Listing::Upcoming) => "/tv/on_the_air",
        }
    }

    /// Discover parameters for a search listing.
    fn discover_params(
        media_type: MediaType,
        filter: &DiscoverFilter,
    ) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(genre) = filter.genre_id {
            params.push(("with_genres", genre.to_string()));
        }
        if let Some(year) = filter.year {
            // Primary release date skips re-releases
            let (gte, lte) = match media_type {
                MediaType::Movie => ("primary_release_date.gte", "primary_release_date.lte"),
                MediaType::Tv => ("first_air_date.gte", "first_air_date.lte"),
            };
            params.push((gte, format!("{:04}-01-01", year)));
            params.push((lte, format!("{:04}-12-31", year)));
        }
        if let Some(rating) = filter.min_rating {
            params.push(("vote_average.gte", rating.to_string()));
        }
        params
    }

    /// GET a TMDB endpoint and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let url = format!("{}{}", self.base_url, path);
        let started = Instant::now();

        let result = self.send(&url, path, query).await;

        let outcome = if result.is_ok() { "ok" } else { "error" };
        CATALOG_REQUESTS
            .with_label_values(&[endpoint, outcome])
            .inc();
        CATALOG_REQUEST_DURATION
            .with_label_values(&[endpoint])
            .observe(started.elapsed().as_secs_f64());

        result
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let response = self
            .client
            .get(url)
            .query(&[("api_key", &self.api_key), ("language", &self.language)])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == 401 {
            return Err(CatalogError::NotConfigured(
                "Invalid TMDB API key".to_string(),
            ));
        }
        if status == 404 {
            return Err(CatalogError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl CatalogProvider for TmdbCatalog {
    async fn page(
        &self,
        media_type: MediaType,
        listing: Listing,
        page: u32,
    ) -> Result<CatalogPage, CatalogError> {
        let path = Self::listing_path(media_type, listing);
        debug!("TMDB listing: path={}, page={}", path, page);

        let mut query = vec![("page", page.to_string())];
        if matches!(listing, Listing::Discover | Listing::Search(_)) {
            query.push(("include_adult", "false".to_string()));
            query.push(("sort_by", "popularity.desc".to_string()));
        }
        if let Listing::Search(filter) = &listing {
            query.extend(Self::discover_params(media_type, filter));
        }

        let response: TmdbListResponse = self.get_json("listing", path, &query).await?;
        Ok(response.into_page(media_type))
    }

    async fn detail(&self, media_type: MediaType, id: u32) -> Result<MediaItem, CatalogError> {
        let path = format!("/{}/{}", media_type.as_str(), id);
        debug!("TMDB detail: media_type={}, id={}", media_type, id);

        let details: TmdbDetails = self.get_json("detail", &path, &[]).await?;
        Ok(details.into_item(media_type))
    }

    async fn genres(&self, media_type: MediaType) -> Result<Vec<Genre>, CatalogError> {
        let path = format!("/genre/{}/list", media_type.as_str());
        let response: TmdbGenreList = self.get_json("genres", &path, &[]).await?;
        Ok(response
            .genres
            .into_iter()
            .map(|g| Genre {
                id: g.id,
                name: g.name,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

/// Pull `status_message` out of a TMDB error body, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<TmdbErrorBody>(body)
        .ok()
        .and_then(|b| b.status_message)
        .unwrap_or_else(|| body.to_string())
}

/// TMDB returns "" for unknown dates.
fn parse_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
}

// ============================================================================
// TMDB API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TmdbErrorBody {
    status_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbListResponse {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    results: Vec<TmdbResult>,
    #[serde(default)]
    total_pages: u32,
    #[serde(default)]
    total_results: u32,
}

/// A list entry. Movies use `title`/`release_date`, shows use `name`/`first_air_date`.
#[derive(Debug, Deserialize)]
struct TmdbResult {
    id: u32,
    title: Option<String>,
    name: Option<String>,
    #[serde(default)]
    genre_ids: Vec<u32>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    #[serde(default)]
    vote_average: f32,
    #[serde(default)]
    popularity: f64,
    poster_path: Option<String>,
    overview: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbDetails {
    id: u32,
    title: Option<String>,
    name: Option<String>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    #[serde(default)]
    vote_average: f32,
    #[serde(default)]
    popularity: f64,
    poster_path: Option<String>,
    overview: Option<String>,
    revenue: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbGenreList {
    #[serde(default)]
    genres: Vec<TmdbGenre>,
}

// ============================================================================
// Conversions
// ============================================================================

impl TmdbListResponse {
    fn into_page(self, media_type: MediaType) -> CatalogPage {
        CatalogPage {
            items: self
                .results
                .into_iter()
                .map(|r| r.into_item(media_type))
                .collect(),
            page: self.page,
            total_pages: self.total_pages,
            total_results: self.total_results,
        }
    }
}

impl TmdbResult {
    fn into_item(self, media_type: MediaType) -> MediaItem {
        let (title, date, kind) = match media_type {
            MediaType::Movie => (
                self.title,
                self.release_date,
                // Not available in list results
                MediaKind::Movie { revenue: None },
            ),
            MediaType::Tv => (self.name, self.first_air_date, MediaKind::TvShow),
        };

        MediaItem {
            id: self.id,
            title,
            genre_ids: self.genre_ids.into_iter().collect(),
            release_date: parse_date(date),
            vote_average: self.vote_average,
            popularity: self.popularity,
            poster_path: self.poster_path,
            overview: self.overview,
            kind,
        }
    }
}

impl TmdbDetails {
    fn into_item(self, media_type: MediaType) -> MediaItem {
        let (title, date, kind) = match media_type {
            MediaType::Movie => (
                self.title,
                self.release_date,
                MediaKind::Movie {
                    revenue: self.revenue.filter(|&r| r > 0),
                },
            ),
            MediaType::Tv => (self.name, self.first_air_date, MediaKind::TvShow),
        };

        MediaItem {
            id: self.id,
            title,
            genre_ids: self.genres.into_iter().map(|g| g.id).collect(),
            release_date: parse_date(date),
            vote_average: self.vote_average,
            popularity: self.popularity,
            poster_path: self.poster_path,
            overview: self.overview,
            kind,
        }
    }
}
