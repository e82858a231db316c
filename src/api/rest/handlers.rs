//! # REST Handlers
//!
//! Request handlers, shared state and response bodies.
//!
//! Every handler builds a fresh [`RequestContext`] bounded by the
//! configured request timeout and passes it down to the service.

use crate::application::context::RequestContext;
use crate::application::error::ApplicationError;
use crate::application::services::StatisticsService;
use crate::domain::entities::{Client, DepthOrder, HistoryOrder, OrderBook, OrderBookDepth};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::error;

// ============================================================================
// State
// ============================================================================

/// Shared state of the REST API.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Service every handler delegates to.
    pub service: StatisticsService,
    /// Deadline applied to each request.
    pub request_timeout: Duration,
}

impl AppState {
    /// Creates the state.
    #[must_use]
    pub fn new(service: StatisticsService, request_timeout: Duration) -> Self {
        Self {
            service,
            request_timeout,
        }
    }

    fn context(&self) -> RequestContext {
        RequestContext::with_timeout(self.request_timeout)
    }
}

// ============================================================================
// Request / Response Bodies
// ============================================================================

/// Query string of `GET /api/get-order-book`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderBookQuery {
    /// Exchange name.
    #[serde(default)]
    pub exchange_name: String,
    /// Trading pair.
    #[serde(default)]
    pub pair: String,
}

impl OrderBookQuery {
    fn validate(&self) -> Result<(), ApplicationError> {
        if self.exchange_name.trim().is_empty() {
            return Err(ApplicationError::validation("exchange_name is required"));
        }
        if self.pair.trim().is_empty() {
            return Err(ApplicationError::validation("pair is required"));
        }
        Ok(())
    }
}

/// Body of `GET /api/get-order-book`.
///
/// On failure `asks` and `bids` are empty and `message` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookResponse {
    /// Ask levels.
    pub asks: Vec<DepthOrder>,
    /// Bid levels.
    pub bids: Vec<DepthOrder>,
    /// Error description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<OrderBookDepth> for OrderBookResponse {
    fn from(depth: OrderBookDepth) -> Self {
        let (asks, bids) = depth.into_parts();
        Self {
            asks,
            bids,
            message: None,
        }
    }
}

impl OrderBookResponse {
    fn failure(err: &ApplicationError) -> Self {
        Self {
            message: Some(err.to_string()),
            ..Self::from(OrderBookDepth::empty())
        }
    }
}

/// Body carrying a single message, used for acknowledgements and errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable message.
    pub message: String,
}

impl MessageResponse {
    /// Creates a message body.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: String,
}

// ============================================================================
// Errors
// ============================================================================

/// Application error rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub ApplicationError);

impl ApiError {
    /// Returns the HTTP status for the wrapped error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        status_for(&self.0)
    }
}

impl From<ApplicationError> for ApiError {
    fn from(err: ApplicationError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ApplicationError::validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        (status, Json(MessageResponse::new(self.0.to_string()))).into_response()
    }
}

/// Maps an application error onto a status code.
///
/// Validation is 400, not found 404, an interrupted request 408 and every
/// other store failure 500.
#[must_use]
pub fn status_for(err: &ApplicationError) -> StatusCode {
    if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if err.is_cancelled() {
        StatusCode::REQUEST_TIMEOUT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /api/get-order-book?exchange_name=..&pair=..`
pub async fn get_order_book(
    State(state): State<AppState>,
    query: Result<Query<OrderBookQuery>, QueryRejection>,
) -> (StatusCode, Json<OrderBookResponse>) {
    let result = match query {
        Ok(Query(query)) => match query.validate() {
            Ok(()) => {
                state
                    .service
                    .get_order_book(&state.context(), &query.exchange_name, &query.pair)
                    .await
            }
            Err(e) => Err(e),
        },
        Err(rejection) => Err(ApplicationError::validation(rejection.body_text())),
    };

    match result {
        Ok(depth) => (StatusCode::OK, Json(depth.into())),
        Err(e) => (status_for(&e), Json(OrderBookResponse::failure(&e))),
    }
}

/// `POST /api/save-order-book`
pub async fn save_order_book(
    State(state): State<AppState>,
    body: Result<Json<OrderBook>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(order_book) = body?;

    state
        .service
        .save_order_book(&state.context(), &order_book)
        .await?;

    Ok(Json(MessageResponse::new("Order book saved successfully")))
}

/// `GET /api/get-history`, with the client as JSON body.
pub async fn get_order_history(
    State(state): State<AppState>,
    body: Result<Json<Client>, JsonRejection>,
) -> Result<Json<Vec<HistoryOrder>>, ApiError> {
    let Json(client) = body?;

    let history = state
        .service
        .get_order_history(&state.context(), &client)
        .await?;

    Ok(Json(history))
}

/// `POST /api/save-history`
///
/// The client is taken from the order's four key fields.
pub async fn save_order(
    State(state): State<AppState>,
    body: Result<Json<HistoryOrder>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(order) = body?;
    let client = order.client();

    state
        .service
        .save_order(&state.context(), &client, &order)
        .await?;

    Ok(Json(MessageResponse::new("Order saved successfully")))
}

/// `GET /api/health`
#[allow(clippy::unused_async)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::context::Interrupted;
    use crate::infrastructure::persistence::StoreError;
    use crate::application::error::ServiceOperation;

    #[test]
    fn status_mapping() {
        let validation = ApplicationError::validation("pair is required");
        let not_found = ApplicationError::store(
            ServiceOperation::GetOrderBook,
            StoreError::not_found("Kraken", "ETH_USD"),
        );
        let cancelled = ApplicationError::store(
            ServiceOperation::SaveOrder,
            StoreError::cancelled("save_order", "c1", Interrupted::DeadlineExceeded),
        );
        let write = ApplicationError::store(
            ServiceOperation::SaveOrder,
            StoreError::write("save_order", "c1", "pool closed"),
        );
        let query = ApplicationError::store(
            ServiceOperation::GetOrderHistory,
            StoreError::query("get_order_history", "c1", "decode failed"),
        );

        assert_eq!(status_for(&validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&not_found), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&cancelled), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(status_for(&write), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(&query), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn order_book_failure_has_empty_sides() {
        let err = ApplicationError::validation("pair is required");
        let body = OrderBookResponse::failure(&err);
        assert!(body.asks.is_empty());
        assert!(body.bids.is_empty());
        assert_eq!(body.message.as_deref(), Some("validation error: pair is required"));
    }

    #[test]
    fn successful_order_book_omits_message() {
        let body = OrderBookResponse::from(OrderBookDepth::empty());
        let json = serde_json::to_value(&body).unwrap_or_default();
        assert_eq!(json, serde_json::json!({ "asks": [], "bids": [] }));
    }

    #[test]
    fn query_requires_both_fields() {
        let missing_pair = OrderBookQuery {
            exchange_name: "Binance".to_string(),
            pair: String::new(),
        };
        assert!(missing_pair.validate().is_err());
        assert!(OrderBookQuery::default().validate().is_err());

        let complete = OrderBookQuery {
            exchange_name: "Binance".to_string(),
            pair: "BTC_USD".to_string(),
        };
        assert!(complete.validate().is_ok());
    }
}
