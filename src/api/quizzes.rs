//! Quiz endpoints
//!
//! - GET /api/quizzes - Active quizzes
//! - GET /api/quizzes/my/{userId} - Quizzes created by the caller
//! - GET /api/quizzes/{id}/questions - Questions without answers
//! - POST /api/quizzes - Create a quiz
//! - POST /api/quizzes/submit and /api/quizzes/{id}/submit - Grade an attempt

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateQuizInput, PublicQuestion, Quiz, QuizOutcome, SubmitQuizInput};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/quizzes", get(list_quizzes))
        .route("/quizzes/{id}/questions", get(list_questions))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/quizzes", post(create_quiz))
        .route("/quizzes/my/{user_id}", get(list_my_quizzes))
        .route("/quizzes/submit", post(submit))
        .route("/quizzes/{id}/submit", post(submit_for))
}

/// GET /api/quizzes
async fn list_quizzes(State(state): State<AppState>) -> Result<Json<Vec<Quiz>>, ApiError> {
    Ok(Json(state.services.quizzes.list_active().await?))
}

/// GET /api/quizzes/my/{userId}
async fn list_my_quizzes(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Quiz>>, ApiError> {
    Ok(Json(state.services.quizzes.list_mine(&user, user_id).await?))
}

/// GET /api/quizzes/{id}/questions
async fn list_questions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PublicQuestion>>, ApiError> {
    Ok(Json(state.services.quizzes.public_questions(id).await?))
}

/// POST /api/quizzes
async fn create_quiz(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<CreateQuizInput>,
) -> Result<impl IntoResponse, ApiError> {
    let quiz = state.services.quizzes.create(&user, body).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// POST /api/quizzes/submit - Quiz id in the body
async fn submit(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<SubmitQuizInput>,
) -> Result<Json<QuizOutcome>, ApiError> {
    let quiz_id = body
        .quiz_id
        .ok_or_else(|| ApiError::validation_error("quizId is required"))?;
    Ok(Json(state.services.quizzes.submit(&user, quiz_id, body).await?))
}

/// POST /api/quizzes/{id}/submit
async fn submit_for(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<SubmitQuizInput>,
) -> Result<Json<QuizOutcome>, ApiError> {
    Ok(Json(state.services.quizzes.submit(&user, id, body).await?))
}
