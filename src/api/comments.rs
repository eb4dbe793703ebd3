//! Comment API endpoints
//!
//! - GET /api/posts/{id}/comments - Comments on a post, oldest first
//! - POST /api/posts/{id}/comments - Add a comment
//! - DELETE /api/comments/{id} - Remove a comment

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CommentWithAuthor, CreateCommentInput};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/posts/{id}/comments", get(list_comments))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/comments", post(create_comment))
        .route("/comments/{id}", delete(delete_comment))
}

/// GET /api/posts/{id}/comments
async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<CommentWithAuthor>>, ApiError> {
    Ok(Json(state.services.comments.list(post_id).await?))
}

/// POST /api/posts/{id}/comments
async fn create_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(post_id): Path<i64>,
    Json(body): Json<CreateCommentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .services
        .comments
        .create(&user, post_id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// DELETE /api/comments/{id} (comment author, post author or admin)
async fn delete_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.services.comments.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
