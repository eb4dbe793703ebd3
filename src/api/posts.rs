//! Post API endpoints
//!
//! - GET /api/posts/feed?type=&page=&pageSize=
//! - GET|PUT|DELETE /api/posts/{id}
//! - POST /api/posts
//! - POST /api/posts/{id}/like
//! - POST|DELETE /api/posts/{id}/repost

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{CreatePostInput, LikeToggle, ListParams, PostWithMeta, UpdatePostInput};

/// Feed filter; pagination is read separately as [`PaginationQuery`]
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(rename = "type")]
    pub post_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RepostRequest {
    #[serde(default)]
    pub comment: Option<String>,
}

pub fn optional_router() -> Router<AppState> {
    Router::new()
        .route("/posts/feed", get(feed))
        .route("/posts/{id}", get(get_post))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create_post))
        .route("/posts/{id}", axum::routing::put(update_post).delete(delete_post))
        .route("/posts/{id}/like", post(toggle_like))
        .route("/posts/{id}/repost", post(repost).delete(unrepost))
}

/// GET /api/posts/feed
async fn feed(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<FeedQuery>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Vec<PostWithMeta>>, ApiError> {
    let posts = state
        .services
        .posts
        .feed(
            query.post_type.as_deref(),
            ListParams::from(&pagination),
            viewer.id(),
        )
        .await?;
    Ok(Json(posts))
}

/// GET /api/posts/{id}
async fn get_post(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<PostWithMeta>, ApiError> {
    Ok(Json(state.services.posts.get(id, viewer.id()).await?))
}

/// POST /api/posts
async fn create_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<CreatePostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.services.posts.create(&user, body).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /api/posts/{id} (author only)
async fn update_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostInput>,
) -> Result<Json<PostWithMeta>, ApiError> {
    Ok(Json(state.services.posts.update(&user, id, body).await?))
}

/// DELETE /api/posts/{id} (author or admin)
async fn delete_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.services.posts.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/posts/{id}/like - Toggle like
async fn toggle_like(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<LikeToggle>, ApiError> {
    Ok(Json(state.services.social.toggle_like(&user, id).await?))
}

/// POST /api/posts/{id}/repost
async fn repost(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    body: Option<Json<RepostRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = body.and_then(|Json(b)| b.comment);
    let repost = state.services.social.repost(&user, id, comment).await?;
    Ok((StatusCode::CREATED, Json(repost)))
}

/// DELETE /api/posts/{id}/repost
async fn unrepost(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.services.social.unrepost(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
