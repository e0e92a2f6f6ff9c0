use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use std::sync::Arc;

use super::{catalog, favourites, handlers, middleware::metrics_middleware, session};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::get_metrics))
        // Catalog
        .route("/catalog/{media_type}", get(catalog::browse))
        .route("/catalog/{media_type}/genres", get(catalog::genres))
        .route("/catalog/{media_type}/{id}", get(catalog::detail))
        // Session
        .route(
            "/session",
            get(session::get_session)
                .post(session::sign_in)
                .delete(session::sign_out),
        )
        // Favourites
        .route("/favourites/{media_type}", get(favourites::list_favourites))
        .route(
            "/favourites/{media_type}/items",
            get(favourites::favourite_items),
        )
        .route(
            "/favourites/{media_type}/{id}",
            put(favourites::add_favourite).delete(favourites::remove_favourite),
        )
        .layer(middleware::from_fn(metrics_middleware))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}
