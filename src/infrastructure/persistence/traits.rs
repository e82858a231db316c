//! # Store Traits
//!
//! Port definition for statistics persistence.
//!
//! [`StatisticsStore`] is the contract a durable backend implements. It has
//! exactly four operations, each bounded by a [`RequestContext`]:
//!
//! - [`get_order_book`](StatisticsStore::get_order_book)
//! - [`save_order_book`](StatisticsStore::save_order_book)
//! - [`get_order_history`](StatisticsStore::get_order_history)
//! - [`save_order`](StatisticsStore::save_order)
//!
//! # Examples
//!
//! ```ignore
//! use statistics_service::infrastructure::persistence::traits::StatisticsStore;
//!
//! async fn latest_asks(store: &impl StatisticsStore, ctx: &RequestContext) {
//!     let depth = store.get_order_book(ctx, "Binance", "BTC_USD").await?;
//!     println!("{} ask levels", depth.asks.len());
//! }
//! ```

use crate::application::context::{Interrupted, RequestContext};
use crate::domain::entities::{Client, HistoryOrder, OrderBook, OrderBookDepth};
use crate::domain::value_objects::ParseEnumError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for store operations.
///
/// Messages name the failing operation and its key parameters, never the
/// query text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No order book stored for the key.
    #[error("order book not found: exchange={exchange} pair={pair}")]
    NotFound {
        /// Exchange name.
        exchange: String,
        /// Trading pair.
        pair: String,
    },

    /// A read failed: malformed query, type mismatch or lost connection.
    #[error("query error in {operation} ({key}): {message}")]
    Query {
        /// Store operation name.
        operation: &'static str,
        /// Rendered key parameters.
        key: String,
        /// Driver message.
        message: String,
    },

    /// A write failed: constraint violation or lost connection.
    #[error("write error in {operation} ({key}): {message}")]
    Write {
        /// Store operation name.
        operation: &'static str,
        /// Rendered key parameters.
        key: String,
        /// Driver message.
        message: String,
    },

    /// The request context was cancelled or expired mid-operation.
    #[error("{operation} ({key}) interrupted: {cause}")]
    Cancelled {
        /// Store operation name.
        operation: &'static str,
        /// Rendered key parameters.
        key: String,
        /// What interrupted the operation.
        cause: Interrupted,
    },
}

impl StoreError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(exchange: impl Into<String>, pair: impl Into<String>) -> Self {
        Self::NotFound {
            exchange: exchange.into(),
            pair: pair.into(),
        }
    }

    /// Creates a query error.
    #[must_use]
    pub fn query(
        operation: &'static str,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Query {
            operation,
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a write error.
    #[must_use]
    pub fn write(
        operation: &'static str,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Write {
            operation,
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(operation: &'static str, key: impl Into<String>, cause: Interrupted) -> Self {
        Self::Cancelled {
            operation,
            key: key.into(),
            cause,
        }
    }

    /// Returns true if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this is a query error.
    #[must_use]
    pub fn is_query(&self) -> bool {
        matches!(self, Self::Query { .. })
    }

    /// Returns true if this is a write error.
    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. })
    }

    /// Returns true if the request context interrupted the operation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns true if the caller may retry the same request.
    ///
    /// Not found and cancellation are client-retryable; query and write
    /// failures are server faults.
    #[must_use]
    pub fn is_client_retryable(&self) -> bool {
        self.is_not_found() || self.is_cancelled()
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// How a store treats a client row that already exists when saving an
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientConflictPolicy {
    /// Keep the existing row and save the order (insert-or-ignore).
    #[default]
    Ignore,
    /// Fail the whole save with a write error.
    Reject,
}

impl fmt::Display for ClientConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignore => write!(f, "ignore"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for ClientConflictPolicy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "reject" => Ok(Self::Reject),
            _ => Err(ParseEnumError::InvalidValue(
                "ClientConflictPolicy",
                s.to_string(),
            )),
        }
    }
}

/// Persistence contract for order books and order history.
///
/// Implementations hold no mutable state between calls beyond the backing
/// store itself, and must honour the context: an interrupted operation
/// fails with [`StoreError::Cancelled`] and leaves no partial writes.
#[async_trait]
pub trait StatisticsStore: Send + Sync + fmt::Debug {
    /// Gets the asks and bids of the most recently saved order book for
    /// `(exchange, pair)`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no snapshot exists for the key,
    /// `StoreError::Query` if the read fails.
    async fn get_order_book(
        &self,
        ctx: &RequestContext,
        exchange: &str,
        pair: &str,
    ) -> StoreResult<OrderBookDepth>;

    /// Appends an order book snapshot.
    ///
    /// No validation of prices, quantities or level ordering is performed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Write` on constraint violation or connectivity
    /// failure.
    async fn save_order_book(&self, ctx: &RequestContext, order_book: &OrderBook)
    -> StoreResult<()>;

    /// Gets all history orders whose four key fields equal `client`.
    ///
    /// An unknown client yields an empty vector. Orders come back in
    /// insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Query` if the read or any row decode fails.
    async fn get_order_history(
        &self,
        ctx: &RequestContext,
        client: &Client,
    ) -> StoreResult<Vec<HistoryOrder>>;

    /// Saves `client` and `order` as one unit of work.
    ///
    /// If either insert fails nothing is persisted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Write` if either insert fails, including a
    /// duplicate client under [`ClientConflictPolicy::Reject`].
    async fn save_order(
        &self,
        ctx: &RequestContext,
        client: &Client,
        order: &HistoryOrder,
    ) -> StoreResult<()>;
}

/// Renders an order book key for error messages and logs.
#[must_use]
pub fn book_key(exchange: &str, pair: &str) -> String {
    format!("exchange={exchange} pair={pair}")
}
