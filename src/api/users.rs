//! User API endpoints
//!
//! Profiles, settings, per-user lists and the follow graph:
//! - GET /api/users/me
//! - GET|PUT /api/users/{id}
//! - GET /api/users/{id}/stats
//! - GET|PUT /api/users/{id}/settings
//! - GET /api/users/{id}/posts, /liked-posts, /reposts, /book-logs, /achievements
//! - POST|DELETE /api/users/{id}/follow, GET /follow-status, /followers, /following
//! - GET /api/leaderboard

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::StatusQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::api::responses::{FollowingResponse, UserResponse};
use crate::models::{
    AchievementProgress, BookLogWithBook, PostWithMeta, RepostWithPost, UpdateProfileInput,
    UpdateSettingsInput, UserSettings, UserStats, UserSummary,
};

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

/// Routes that work for visitors and add viewer-specific fields when signed in
pub fn optional_router() -> Router<AppState> {
    Router::new()
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/posts", get(list_posts))
        .route("/users/{id}/reposts", get(list_reposts))
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/users/{id}/stats", get(get_stats))
        .route("/users/{id}/followers", get(list_followers))
        .route("/users/{id}/following", get(list_following))
        .route("/users/{id}/achievements", get(list_achievements))
        .route("/leaderboard", get(leaderboard))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me))
        .route("/users/{id}", axum::routing::put(update_user))
        .route("/users/{id}/settings", get(get_settings).put(update_settings))
        .route("/users/{id}/liked-posts", get(list_liked_posts))
        .route("/users/{id}/follow", axum::routing::post(follow).delete(unfollow))
        .route("/users/{id}/follow-status", get(follow_status))
        .route("/users/{id}/book-logs", get(list_book_logs))
}

/// GET /api/users/me
async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<UserResponse> {
    Json(UserResponse::private(user))
}

/// GET /api/users/{id}
async fn get_user(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.services.users.get(id).await?;
    Ok(Json(UserResponse::for_viewer(user, viewer.0.as_ref())))
}

/// PUT /api/users/{id}
async fn update_user(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateProfileInput>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.services.users.update_profile(&actor, id, body).await?;
    Ok(Json(UserResponse::private(user)))
}

/// GET /api/users/{id}/stats
async fn get_stats(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserStats>, ApiError> {
    Ok(Json(state.services.users.stats(id).await?))
}

/// GET /api/users/{id}/settings
async fn get_settings(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<UserSettings>, ApiError> {
    Ok(Json(state.services.users.settings(&actor, id).await?))
}

/// PUT /api/users/{id}/settings
async fn update_settings(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateSettingsInput>,
) -> Result<Json<UserSettings>, ApiError> {
    Ok(Json(
        state.services.users.update_settings(&actor, id, body).await?,
    ))
}

/// GET /api/users/{id}/posts
async fn list_posts(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PostWithMeta>>, ApiError> {
    Ok(Json(state.services.posts.list_by_user(id, viewer.id()).await?))
}

/// GET /api/users/{id}/liked-posts (owner only)
async fn list_liked_posts(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PostWithMeta>>, ApiError> {
    Ok(Json(state.services.posts.liked(&actor, id).await?))
}

/// GET /api/users/{id}/reposts
async fn list_reposts(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<RepostWithPost>>, ApiError> {
    Ok(Json(state.services.social.reposts_of(id, viewer.id()).await?))
}

/// POST /api/users/{id}/follow - Toggle following
async fn follow(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<FollowingResponse>, ApiError> {
    let following = state.services.social.toggle_follow(&actor, id).await?;
    Ok(Json(FollowingResponse { following }))
}

/// DELETE /api/users/{id}/follow
async fn unfollow(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<FollowingResponse>, ApiError> {
    state.services.social.unfollow(&actor, id).await?;
    Ok(Json(FollowingResponse { following: false }))
}

/// GET /api/users/{id}/follow-status
async fn follow_status(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<FollowingResponse>, ApiError> {
    let following = state.services.social.is_following(actor.id, id).await?;
    Ok(Json(FollowingResponse { following }))
}

/// GET /api/users/{id}/followers
async fn list_followers(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let users = state.services.social.followers(id).await?;
    Ok(Json(users.iter().map(|u| u.summary()).collect()))
}

/// GET /api/users/{id}/following
async fn list_following(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let users = state.services.social.following(id).await?;
    Ok(Json(users.iter().map(|u| u.summary()).collect()))
}

/// GET /api/users/{id}/book-logs?status= (owner only)
async fn list_book_logs(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<BookLogWithBook>>, ApiError> {
    let logs = state
        .services
        .reading
        .list_for_user(&actor, id, query.status.as_deref())
        .await?;
    Ok(Json(logs))
}

/// GET /api/users/{id}/achievements - Progress on every active achievement
async fn list_achievements(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<AchievementProgress>>, ApiError> {
    Ok(Json(state.services.achievements.progress_for(id).await?))
}

/// GET /api/leaderboard?limit=
async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.services.users.leaderboard(query.limit).await?;
    Ok(Json(users.into_iter().map(UserResponse::public).collect()))
}
