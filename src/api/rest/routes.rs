//! # REST Routes
//!
//! Router construction.

use crate::api::rest::handlers::{self, AppState};
use axum::Router;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

/// Builds the router with every endpoint and the tracing layer.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/get-order-book", get(handlers::get_order_book))
        .route("/api/save-order-book", post(handlers::save_order_book))
        .route("/api/get-history", get(handlers::get_order_history))
        .route("/api/save-history", post(handlers::save_order))
        .route("/api/health", get(handlers::health_check))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
