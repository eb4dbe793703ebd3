//! Guest session endpoints
//!
//! - POST /api/guest/session
//! - GET /api/guest/session/{sessionId}
//! - PUT /api/guest/session/{sessionId}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{GuestSession, UpdateGuestSessionInput};

#[derive(Debug, Default, Deserialize)]
pub struct CreateGuestRequest {
    #[serde(default)]
    pub preferences: Option<serde_json::Value>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/guest/session", post(create_session))
        .route(
            "/guest/session/{session_id}",
            axum::routing::get(get_session).put(update_session),
        )
}

/// POST /api/guest/session
async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateGuestRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let preferences = body.and_then(|Json(b)| b.preferences);
    let session = state.services.guests.create(preferences).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/guest/session/{sessionId}
async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<GuestSession>, ApiError> {
    Ok(Json(state.services.guests.get(&session_id).await?))
}

/// PUT /api/guest/session/{sessionId}
async fn update_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<UpdateGuestSessionInput>,
) -> Result<Json<GuestSession>, ApiError> {
    Ok(Json(
        state.services.guests.update(&session_id, body).await?,
    ))
}
