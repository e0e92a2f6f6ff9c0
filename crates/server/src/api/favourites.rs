//! Favourites API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use filmdeck_core::{
    Applied, FavouriteOp, FavouritesKey, FavouritesStore, FilterPipeline, FilterState, MediaType,
    MutationState, PageView, PersistenceError, SessionError, SortMode,
};

use super::catalog::{fetch_error, filter_state, parse_media_type};
use super::handlers::{api_error, ApiError};
use crate::metrics::SIGNED_OUT_REJECTIONS;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FavouritesResponse {
    pub user_id: String,
    pub media_type: MediaType,
    pub ids: Vec<u32>,
}

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub media_type: MediaType,
    pub media_id: u32,
    pub operation: FavouriteOp,
    pub state: MutationState,
    /// Membership after the mutation settled.
    pub member: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct FavouriteItemsParams {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
}

impl FavouriteItemsParams {
    fn filter(&self) -> FilterState {
        filter_state(self.title.as_deref(), self.genre.as_deref())
    }
}

fn signed_in_store(state: &AppState, operation: &str) -> Result<Arc<FavouritesStore>, ApiError> {
    state.favourites().signed_in_store().map_err(|e| match e {
        SessionError::SignedOut => {
            SIGNED_OUT_REJECTIONS.with_label_values(&[operation]).inc();
            api_error(StatusCode::UNAUTHORIZED, e.to_string())
        }
        SessionError::InvalidUserId(_) => api_error(StatusCode::BAD_REQUEST, e.to_string()),
    })
}

fn persistence_error(e: PersistenceError) -> ApiError {
    match e {
        PersistenceError::Mutation { .. } => api_error(StatusCode::CONFLICT, e.to_string()),
        other => {
            warn!("Favourites backend failed: {}", other);
            api_error(StatusCode::BAD_GATEWAY, other.to_string())
        }
    }
}

/// GET /api/v1/favourites/{media_type}
pub async fn list_favourites(
    State(state): State<Arc<AppState>>,
    Path(media_type): Path<String>,
) -> Result<Json<FavouritesResponse>, ApiError> {
    let media_type = parse_media_type(&media_type)?;
    let store = signed_in_store(&state, "list")?;
    Ok(Json(FavouritesResponse {
        user_id: store.user_id().to_string(),
        media_type,
        ids: store.ids(media_type),
    }))
}

/// GET /api/v1/favourites/{media_type}/items
///
/// Fetch the full records of the user's favourites and show them on the
/// favourites screen of this media type, filtered, sorted and paged like a
/// catalog listing.
pub async fn favourite_items(
    State(state): State<Arc<AppState>>,
    Path(media_type): Path<String>,
    Query(params): Query<FavouriteItemsParams>,
) -> Result<Json<PageView<FavouritesKey>>, ApiError> {
    let media_type = parse_media_type(&media_type)?;
    let sort = match params.sort.as_deref() {
        Some(raw) => raw
            .parse::<SortMode>()
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?,
        None => SortMode::None,
    };
    let store = signed_in_store(&state, "items")?;
    let ids = store.ids(media_type);

    let ticket = {
        let mut screens = state.favourite_screens().lock().await;
        screens
            .entry(media_type)
            .or_insert_with(|| state.new_browser())
            .begin_query(FavouritesKey::new(store.user_id(), media_type))
    };

    let collection = state
        .aggregator()
        .details(media_type, &ids)
        .await
        .map_err(fetch_error)?;

    let view = {
        let mut screens = state.favourite_screens().lock().await;
        let browser = screens
            .entry(media_type)
            .or_insert_with(|| state.new_browser());

        // Drop items removed while the details were in flight
        browser.set_pipeline(
            FilterPipeline::new().with_predicate(store.member_predicate(media_type)),
        );
        if browser.apply(&ticket, Arc::new(collection)) == Applied::Discarded {
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
        "Favourites screen: key={}, page={}/{}, results={}",
        ticket.key(),
        view.page,
        view.total_pages,
        view.total_results
    );

    Ok(Json(view))
}

/// PUT /api/v1/favourites/{media_type}/{id}
pub async fn add_favourite(
    State(state): State<Arc<AppState>>,
    Path((media_type, id)): Path<(String, u32)>,
) -> Result<Json<MutationResponse>, ApiError> {
    mutate(&state, &media_type, id, FavouriteOp::Add).await
}

/// DELETE /api/v1/favourites/{media_type}/{id}
pub async fn remove_favourite(
    State(state): State<Arc<AppState>>,
    Path((media_type, id)): Path<(String, u32)>,
) -> Result<Json<MutationResponse>, ApiError> {
    mutate(&state, &media_type, id, FavouriteOp::Remove).await
}

async fn mutate(
    state: &AppState,
    media_type: &str,
    id: u32,
    operation: FavouriteOp,
) -> Result<Json<MutationResponse>, ApiError> {
    let media_type = parse_media_type(media_type)?;
    let store = signed_in_store(state, operation.as_str())?;

    let result = match operation {
        FavouriteOp::Add => store.add(media_type, id).await,
        FavouriteOp::Remove => store.remove(media_type, id).await,
    };
    let mutation_state = result.map_err(persistence_error)?;

    Ok(Json(MutationResponse {
        media_type,
        media_id: id,
        operation,
        state: mutation_state,
        member: store.contains(media_type, id),
    }))
}
