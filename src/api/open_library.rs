//! Open Library pass-through
//!
//! - GET /api/openlibrary/search?q=&limit=
//! - GET /api/openlibrary/books/{key}
//!
//! Responses are relayed as Open Library sent them (served from the client cache
//! when fresh).

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::api::middleware::{ApiError, AppState};

/// Default number of hits for the raw search
pub const DEFAULT_LIMIT: u32 = 10;

pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct ProxySearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u32>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/openlibrary/search", get(search))
        .route("/openlibrary/books/{key}", get(edition))
}

/// GET /api/openlibrary/search
async fn search(
    State(state): State<AppState>,
    Query(query): Query<ProxySearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(ApiError::validation_error("Search query is required"));
    }
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let raw = state.services.open_library.search_raw(q, limit).await?;
    Ok(Json(raw.as_ref().clone()))
}

/// GET /api/openlibrary/books/{key}
async fn edition(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let raw = state.services.open_library.edition_raw(&key).await?;
    Ok(Json(raw.as_ref().clone()))
}
