//! Route definitions for the StockHub HTTP API.
//!
//! All routes are organized by domain and mounted under `/api`.
//! The router receives `AppState` and passes it to all handlers via
//! Axum's `State` extractor.

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::cors::build_cors_layer;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(notification_routes())
        .merge(stream_routes())
        .merge(system_routes());

    let cors = build_cors_layer(&state.config.server.cors);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Notification send, list, and read-state endpoints.
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(handlers::notification::list))
        .route(
            "/notifications/unread-count",
            get(handlers::notification::unread_count),
        )
        .route(
            "/notifications/{id}/read",
            put(handlers::notification::mark_read),
        )
        .route(
            "/notifications/read-all",
            put(handlers::notification::mark_all_read),
        )
        .route(
            "/notifications/broadcast",
            post(handlers::notification::send_broadcast),
        )
        .route(
            "/notifications/send",
            post(handlers::notification::send_to_users),
        )
        .route(
            "/notifications/send-role",
            post(handlers::notification::send_to_role),
        )
}

/// Push stream endpoints.
fn stream_routes() -> Router<AppState> {
    Router::new()
        .route("/stream", get(handlers::stream::stream))
        .route("/stream/{id}/ping", post(handlers::stream::ping))
}

/// Health and statistics endpoints.
fn system_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/stats", get(handlers::stats::stats))
}
