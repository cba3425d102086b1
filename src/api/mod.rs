//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for the Cosplayhub backend:
//! - Auth endpoints (register, token, refresh, user, logout)
//! - Event endpoints (CRUD, filtered list, convenience views)
//! - Category endpoints
//!
//! Route groups: public routes are open to everyone; write routes sit
//! behind the superuser guard. Actor resolution runs on every request and
//! degrades to anonymous instead of failing, so public reads never see a
//! token error.

pub mod auth;
pub mod categories;
pub mod events;
pub mod middleware;
pub mod permissions;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Write routes (superuser only)
    let write_routes = Router::new()
        .nest("/events", events::write_router())
        .nest("/categories", categories::write_router())
        .route_layer(axum_middleware::from_fn(middleware::require_superuser));

    // Public routes
    Router::new()
        .nest("/auth", auth::router())
        .nest("/events", events::public_router())
        .nest("/categories", categories::public_router())
        .merge(write_routes)
        // Actor resolution runs for every API request
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::resolve_actor,
        ))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// End-to-end tests
// ============================================================================
