//! Session API handlers: sign in, sign out, current identity.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use filmdeck_core::{Identity, IdentityProvider, SessionError};

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub signed_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    /// Total favourites of the signed-in user across media types.
    pub favourites: usize,
}

fn session_response(state: &AppState) -> SessionResponse {
    let identity = state.identity().current_identity();
    let favourites = state
        .favourites()
        .store()
        .map(|store| store.len())
        .unwrap_or(0);
    SessionResponse {
        signed_in: identity.is_some(),
        identity,
        favourites,
    }
}

/// Bring the favourites store in line with the identity before answering.
async fn sync_favourites(state: &AppState) -> Result<(), ApiError> {
    state
        .favourites()
        .sync()
        .await
        .map(|_| ())
        .map_err(|e| api_error(StatusCode::BAD_GATEWAY, e.to_string()))
}

/// GET /api/v1/session
pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    Json(session_response(&state))
}

/// POST /api/v1/session
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let mut identity = Identity::new(request.user_id.trim());
    if let Some(name) = request.display_name {
        identity = identity.with_display_name(name);
    }

    state.identity().sign_in(identity).map_err(|e| match e {
        SessionError::InvalidUserId(_) => api_error(StatusCode::BAD_REQUEST, e.to_string()),
        SessionError::SignedOut => api_error(StatusCode::UNAUTHORIZED, e.to_string()),
    })?;
    sync_favourites(&state).await?;

    Ok(Json(session_response(&state)))
}

/// DELETE /api/v1/session
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionResponse>, ApiError> {
    state.identity().sign_out();
    sync_favourites(&state).await?;
    Ok(Json(session_response(&state)))
}
