//! Authentication API endpoints
//!
//! Handles HTTP requests for user authentication:
//! - POST /api/auth/register - Reader registration
//! - POST /api/auth/register-admin - Administrator registration with a key
//! - POST /api/auth/login - Login by email or username
//! - PUT /api/auth/password - Change password

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{AuthResponse, MessageResponse};
use crate::models::CreateUserInput;

/// Request body for registration
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl From<RegisterRequest> for CreateUserInput {
    fn from(body: RegisterRequest) -> Self {
        CreateUserInput {
            username: body.username,
            email: body.email,
            password: body.password,
            display_name: body.display_name,
            is_admin: false,
        }
    }
}

/// Request body for administrator registration
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAdminRequest {
    #[serde(default)]
    pub admin_key: String,
    #[serde(flatten)]
    pub account: RegisterRequest,
}

/// Request body for login. `email` also accepts a username.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/register-admin", post(register_admin))
        .route("/auth/login", post(login))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/auth/password", put(change_password))
}

/// POST /api/auth/register - Reader registration
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.services.users.register(body.into()).await?;
    Ok((StatusCode::CREATED, Json(AuthResponse::from(session))))
}

/// POST /api/auth/register-admin - Administrator registration
async fn register_admin(
    State(state): State<AppState>,
    Json(body): Json<RegisterAdminRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .services
        .users
        .register_admin(&body.admin_key, body.account.into())
        .await?;
    Ok((StatusCode::CREATED, Json(AuthResponse::from(session))))
}

/// POST /api/auth/login - Login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let session = state
        .services
        .users
        .login(&body.email, &body.password)
        .await?;
    Ok(Json(session.into()))
}

/// PUT /api/auth/password - Change password
async fn change_password(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .services
        .users
        .change_password(user.id, &body.current_password, &body.new_password)
        .await?;
    Ok(Json(MessageResponse::new("Password updated")))
}
