//! Admin API endpoints
//!
//! Handles HTTP requests for moderation and site management:
//! - GET /api/admin/reports?status= and PUT /api/admin/reports/{id}
//! - GET /api/admin/stats - Dashboard numbers and request statistics
//! - GET /api/admin/users, PUT|DELETE /api/admin/users/{id}
//! - POST /api/admin/achievements
//!
//! Every route here sits behind `require_auth` and `require_admin`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::StatusQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::UserResponse;
use crate::models::{AdminStats, ContentReport, CreateAchievementInput};

#[derive(Debug, Deserialize)]
pub struct ReviewReportRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub is_admin: bool,
}

/// Build the admin router (nested under `/admin`)
pub fn router() -> Router<AppState> {
    Router::new()
        // Moderation
        .route("/reports", get(list_reports))
        .route("/reports/{id}", put(review_report))
        // Dashboard
        .route("/stats", get(get_stats))
        // User management
        .route("/users", get(list_users))
        .route("/users/{id}", put(update_user).delete(delete_user))
        // Achievements
        .route("/achievements", post(create_achievement))
}

/// GET /api/admin/reports?status=
async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<ContentReport>>, ApiError> {
    let reports = state
        .services
        .moderation
        .list_reports(query.status.as_deref())
        .await?;
    Ok(Json(reports))
}

/// PUT /api/admin/reports/{id} - Set a report's status
///
/// Approving or resolving a report removes the reported post.
async fn review_report(
    State(state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<ReviewReportRequest>,
) -> Result<Json<ContentReport>, ApiError> {
    let report = state
        .services
        .moderation
        .review_report(&admin, id, &body.status)
        .await?;
    Ok(Json(report))
}

/// GET /api/admin/stats
async fn get_stats(State(state): State<AppState>) -> Result<Json<AdminStats>, ApiError> {
    let stats = state.services.moderation.stats().await?;
    let requests = &state.request_stats;
    Ok(Json(AdminStats {
        uptime_seconds: requests.uptime_seconds(),
        total_requests: requests.total_requests(),
        avg_response_time_ms: requests.avg_response_time_ms(),
        ..stats
    }))
}

/// GET /api/admin/users - Newest first
async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.services.users.list_all().await?;
    Ok(Json(users.into_iter().map(UserResponse::private).collect()))
}

/// PUT /api/admin/users/{id} - Grant or revoke admin rights
async fn update_user(
    State(state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .services
        .users
        .set_admin(&admin, id, body.is_admin)
        .await?;
    Ok(Json(UserResponse::private(user)))
}

/// DELETE /api/admin/users/{id} - Delete a user and everything they own
async fn delete_user(
    State(state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.services.moderation.delete_user(&admin, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/achievements
async fn create_achievement(
    State(state): State<AppState>,
    Json(body): Json<CreateAchievementInput>,
) -> Result<impl IntoResponse, ApiError> {
    let achievement = state.services.achievements.create(body).await?;
    Ok((StatusCode::CREATED, Json(achievement)))
}
