//! # REST API
//!
//! REST endpoints using axum.
//!
//! # Endpoints
//!
//! ## Order Books
//! - `GET /api/get-order-book?exchange_name=..&pair=..` - Latest asks and bids
//! - `POST /api/save-order-book` - Store an order book snapshot
//!
//! ## Order History
//! - `GET /api/get-history` - Orders of the client given as JSON body
//! - `POST /api/save-history` - Store an order and its client
//!
//! ## Health
//! - `GET /api/health` - Liveness check
//!
//! Errors are returned as `{"message": ..}` with 400 for malformed
//! requests, 404 for a missing order book, 408 when the request deadline
//! passes and 500 for store failures.
//!
//! # Usage
//!
//! ```ignore
//! use statistics_service::api::rest::{create_router, AppState};
//! use statistics_service::application::StatisticsService;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let service = StatisticsService::new(Arc::new(store));
//! let router = create_router(AppState::new(service, Duration::from_secs(5)));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    ApiError, AppState, HealthResponse, MessageResponse, OrderBookQuery, OrderBookResponse,
};
pub use routes::create_router;
