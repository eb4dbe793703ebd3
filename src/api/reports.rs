//! Content reports and the public achievement catalogue
//!
//! - POST /api/reports - Report a post (signed-in or anonymous)
//! - GET /api/achievements - Active achievements

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, MaybeUser};
use crate::models::{Achievement, CreateReportInput};

pub fn optional_router() -> Router<AppState> {
    Router::new().route("/reports", post(create_report))
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/achievements", get(list_achievements))
}

/// POST /api/reports
async fn create_report(
    State(state): State<AppState>,
    reporter: MaybeUser,
    Json(body): Json<CreateReportInput>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .services
        .moderation
        .create_report(reporter.0.as_ref(), body)
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// GET /api/achievements
async fn list_achievements(
    State(state): State<AppState>,
) -> Result<Json<Vec<Achievement>>, ApiError> {
    Ok(Json(state.services.achievements.list_active().await?))
}
