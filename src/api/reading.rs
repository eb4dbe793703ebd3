//! Reading log endpoints
//!
//! - POST /api/book-logs - Create or update the caller's log for a book
//! - PATCH /api/book-logs/{id} - Update one of the caller's logs
//!
//! Listing lives under `/api/users/{id}/book-logs`.

use axum::{
    extract::{Path, State},
    routing::{patch, post},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{BookLog, BookLogInput};

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/book-logs", post(upsert_log))
        .route("/book-logs/{id}", patch(patch_log))
}

/// POST /api/book-logs
async fn upsert_log(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<BookLogInput>,
) -> Result<Json<BookLog>, ApiError> {
    Ok(Json(state.services.reading.upsert_log(&user, body).await?))
}

/// PATCH /api/book-logs/{id}
async fn patch_log(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<BookLogInput>,
) -> Result<Json<BookLog>, ApiError> {
    Ok(Json(state.services.reading.patch_log(&user, id, body).await?))
}
