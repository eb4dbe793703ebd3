//! Notification inbox endpoints (all require authentication)

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::MessageResponse;
use crate::models::Notification;

#[derive(Debug, Serialize)]
pub struct UpdatedResponse {
    pub updated: u64,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", put(mark_all_read))
        .route("/notifications/{id}/read", put(mark_read))
}

/// GET /api/notifications
async fn list_notifications(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(state.services.notifications.list(user.id).await?))
}

/// PUT /api/notifications/{id}/read
async fn mark_read(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.services.notifications.mark_read(id, user.id).await?;
    Ok(Json(MessageResponse::new("Notification marked as read")))
}

/// PUT /api/notifications/read-all
async fn mark_all_read(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<UpdatedResponse>, ApiError> {
    let updated = state.services.notifications.mark_all_read(user.id).await?;
    Ok(Json(UpdatedResponse { updated }))
}

/// GET /api/notifications/unread-count
async fn unread_count(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.services.notifications.unread_count(user.id).await?;
    Ok(Json(CountResponse { count }))
}
