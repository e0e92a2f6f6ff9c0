//! Catalog browsing API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use filmdeck_core::{
    Applied, DiscoverFilter, FetchError, FilterState, Genre, Listing, MediaItem, MediaType,
    PageRange, PageView, QueryKey, SortMode,
};

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct BrowseParams {
    #[serde(default)]
    pub listing: Option<String>,
    /// `N` for pages 1..=N, or `A-B`.
    #[serde(default)]
    pub pages: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
    /// Catalog-side genre, `listing=search` only.
    #[serde(default)]
    pub with_genres: Option<u32>,
    /// Release or first-air year, `listing=search` only.
    #[serde(default)]
    pub year: Option<i32>,
    /// Minimum vote average, `listing=search` only.
    #[serde(default)]
    pub min_rating: Option<u8>,
}

impl BrowseParams {
    /// The requested listing, with its search criteria attached.
    fn listing(&self) -> Result<Listing, ApiError> {
        let listing = match self.listing.as_deref() {
            Some(raw) => raw
                .parse::<Listing>()
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?,
            None => Listing::default(),
        };
        let has_criteria =
            self.with_genres.is_some() || self.year.is_some() || self.min_rating.is_some();

        match listing {
            Listing::Search(_) => DiscoverFilter::new(self.with_genres, self.year, self.min_rating)
                .map(Listing::Search)
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string())),
            other if has_criteria => Err(api_error(
                StatusCode::BAD_REQUEST,
                format!(
                    "with_genres, year and min_rating need listing=search, got {}",
                    other.as_str()
                ),
            )),
            other => Ok(other),
        }
    }

    fn filter(&self) -> FilterState {
        filter_state(self.title.as_deref(), self.genre.as_deref())
    }
}

/// Title wins when both title and genre are sent.
pub(super) fn filter_state(title: Option<&str>, genre: Option<&str>) -> FilterState {
    match (title, genre) {
        (Some(title), _) if !title.trim().is_empty() => FilterState::title(title),
        (_, Some(genre)) => FilterState::genre(genre),
        _ => FilterState::default(),
    }
}

#[derive(Debug, Serialize)]
pub struct BrowseResponse {
    #[serde(flatten)]
    pub view: PageView,
    /// Ids on this page that are favourites of the signed-in user.
    pub favourites: Vec<u32>,
}

#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub item: MediaItem,
    pub favourite: bool,
}

pub(super) fn parse_media_type(raw: &str) -> Result<MediaType, ApiError> {
    raw.parse()
        .map_err(|e: filmdeck_core::media::UnknownMediaType| {
            api_error(StatusCode::BAD_REQUEST, e.to_string())
        })
}

pub(super) fn fetch_error(e: FetchError) -> ApiError {
    if e.is_invalid_query() {
        return api_error(StatusCode::BAD_REQUEST, e.to_string());
    }
    if e.is_not_found() {
        return api_error(StatusCode::NOT_FOUND, e.to_string());
    }
    warn!("Catalog fetch failed: {}", e);
    api_error(StatusCode::BAD_GATEWAY, e.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/catalog/{media_type}
///
/// Fetch the requested pages through the aggregator, install them on the
/// screen for this media type and listing, then filter, sort and page.
pub async fn browse(
    State(state): State<Arc<AppState>>,
    Path(media_type): Path<String>,
    Query(params): Query<BrowseParams>,
) -> Result<Json<BrowseResponse>, ApiError> {
    let media_type = parse_media_type(&media_type)?;
    let listing = params.listing()?;
    let pages = match params.pages.as_deref() {
        Some(raw) => raw
            .parse::<PageRange>()
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?,
        None => PageRange::first(state.config().aggregator.default_pages),
    };
    let sort = match params.sort.as_deref() {
        Some(raw) => raw
            .parse::<SortMode>()
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?,
        None => SortMode::None,
    };
    let screen = (media_type, listing.as_str());

    // Oversized queries never become the latest query of a screen
    let key = QueryKey::new(media_type, listing, pages);
    state.aggregator().check(&key).map_err(fetch_error)?;

    let ticket = {
        let mut screens = state.screens().lock().await;
        screens
            .entry(screen)
            .or_insert_with(|| state.new_browser())
            .begin_query(key)
    };

    let collection = state
        .aggregator()
        .fetch(ticket.key())
        .await
        .map_err(fetch_error)?;

    let view = {
        let mut screens = state.screens().lock().await;
        let browser = screens
            .entry(screen)
            .or_insert_with(|| state.new_browser());

        if browser.apply(&ticket, collection) == Applied::Discarded {
            return Err(api_error(
                StatusCode::CONFLICT,
                format!("Query {} was superseded by a newer one", ticket.key()),
            ));
        }
        browser.set_filter(params.filter());
        browser.set_sort(sort);
        browser.set_page(params.page.unwrap_or(1));
        browser.view()
    };

    debug!(
        "Browse: key={}, page={}/{}, results={}",
        ticket.key(),
        view.page,
        view.total_pages,
        view.total_results
    );

    let favourites = view
        .items
        .iter()
        .filter(|item| state.favourites().contains(media_type, item.id))
        .map(|item| item.id)
        .collect();

    Ok(Json(BrowseResponse { view, favourites }))
}

/// GET /api/v1/catalog/{media_type}/genres
pub async fn genres(
    State(state): State<Arc<AppState>>,
    Path(media_type): Path<String>,
) -> Result<Json<Vec<Genre>>, ApiError> {
    let media_type = parse_media_type(&media_type)?;
    let genres = state
        .aggregator()
        .genres(media_type)
        .await
        .map_err(fetch_error)?;
    Ok(Json(genres))
}

/// GET /api/v1/catalog/{media_type}/{id}
pub async fn detail(
    State(state): State<Arc<AppState>>,
    Path((media_type, id)): Path<(String, u32)>,
) -> Result<Json<DetailResponse>, ApiError> {
    let media_type = parse_media_type(&media_type)?;
    let item = state
        .aggregator()
        .detail(media_type, id)
        .await
        .map_err(fetch_error)?;
    let favourite = state.favourites().contains(media_type, id);
    Ok(Json(DetailResponse { item, favourite }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_wins_over_genre() {
        let params = BrowseParams {
            title: Some("Heat".to_string()),
            genre: Some("28".to_string()),
            ..Default::default()
        };
        let filter = params.filter();
        assert_eq!(filter.title_query(), "Heat");
        assert!(filter.genre_filter().is_none());
    }

    #[test]
    fn test_blank_title_falls_back_to_genre() {
        let params = BrowseParams {
            title: Some("  ".to_string()),
            genre: Some("35".to_string()),
            ..Default::default()
        };
        assert_eq!(params.filter().genre_filter(), Some(35));
    }

    #[test]
    fn test_no_filter_params_match_all() {
        assert!(BrowseParams::default().filter().is_match_all());
    }

    #[test]
    fn test_search_listing_carries_criteria() {
        let params = BrowseParams {
            listing: Some("search".to_string()),
            with_genres: Some(35),
            year: Some(2019),
            min_rating: Some(7),
            ..Default::default()
        };
        let expected = DiscoverFilter::new(Some(35), Some(2019), Some(7)).unwrap();
        assert_eq!(params.listing().unwrap(), Listing::Search(expected));
    }

    #[test]
    fn test_search_criteria_rejected_elsewhere() {
        let params = BrowseParams {
            listing: Some("top_rated".to_string()),
            year: Some(2019),
            ..Default::default()
        };
        let (status, _) = params.listing().unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let out_of_range = BrowseParams {
            listing: Some("search".to_string()),
            min_rating: Some(11),
            ..Default::default()
        };
        let (status, _) = out_of_range.listing().unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_parse_media_type_rejects_unknown() {
        let (status, _) = parse_media_type("podcast").unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(parse_media_type("tv").unwrap(), MediaType::Tv);
    }
}
