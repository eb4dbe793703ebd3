//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for Skynote, mounted under `/api`:
//! - Auth and guest session endpoints
//! - User profile, settings and follow graph endpoints
//! - Book catalogue and Open Library pass-through
//! - Post, like, repost and comment endpoints
//! - Reading log, achievement and notification endpoints
//! - Report, quiz and admin endpoints

pub mod admin;
pub mod auth;
pub mod books;
pub mod comments;
pub mod common;
pub mod guest;
pub mod middleware;
pub mod notifications;
pub mod open_library;
pub mod posts;
pub mod quizzes;
pub mod reading;
pub mod reports;
pub mod responses;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, RequestStats};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .merge(auth::protected_router())
        .merge(users::protected_router())
        .merge(books::protected_router())
        .merge(posts::protected_router())
        .merge(comments::protected_router())
        .merge(reading::protected_router())
        .merge(notifications::protected_router())
        .merge(quizzes::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Routes that personalise their answer when a valid token is sent
    let optional_routes = Router::new()
        .merge(users::optional_router())
        .merge(posts::optional_router())
        .merge(reports::optional_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_auth,
        ));

    // Public routes
    Router::new()
        .merge(auth::public_router())
        .merge(guest::router())
        .merge(users::public_router())
        .merge(books::public_router())
        .merge(open_library::router())
        .merge(comments::public_router())
        .merge(reports::public_router())
        .merge(quizzes::public_router())
        .merge(optional_routes)
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) if cors_origin != "*" => cors.allow_origin(origin),
        _ => cors.allow_origin(Any),
    };

    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // Request stats middleware (outermost layer, runs for all requests)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state)
}
