//! Book catalogue endpoints
//!
//! - GET /api/books/search?q=
//! - GET /api/books/trending?period=
//! - GET /api/books/recent
//! - POST /api/books
//! - GET /api/books/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Book, BookCandidate, CreateBookInput, TrendingBook, TrendingPeriod};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    pub period: Option<String>,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/books/search", get(search))
        .route("/books/trending", get(trending))
        .route("/books/recent", get(recent))
        .route("/books/{id}", get(get_book))
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/books", post(create_book))
}

/// GET /api/books/search?q= - Open Library hits followed by local matches
async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<BookCandidate>>, ApiError> {
    Ok(Json(state.services.books.search(&query.q).await?))
}

/// GET /api/books/trending?period=daily|weekly|monthly|all
async fn trending(
    State(state): State<AppState>,
    Query(query): Query<TrendingQuery>,
) -> Result<Json<Vec<TrendingBook>>, ApiError> {
    let period = match query.period.as_deref().filter(|p| !p.is_empty()) {
        Some(raw) => raw
            .parse::<TrendingPeriod>()
            .map_err(|e| ApiError::validation_error(e.to_string()))?,
        None => TrendingPeriod::default(),
    };
    Ok(Json(state.services.books.trending(period).await?))
}

/// GET /api/books/recent
async fn recent(State(state): State<AppState>) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.services.books.recent().await?))
}

/// GET /api/books/{id}
async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(state.services.books.get(id).await?))
}

/// POST /api/books - Add a book, or return the one with the same Open Library key
async fn create_book(
    State(state): State<AppState>,
    Json(body): Json<CreateBookInput>,
) -> Result<impl IntoResponse, ApiError> {
    let book = state.services.books.create_or_resolve(body).await?;
    Ok((StatusCode::CREATED, Json(book)))
}
