//! # Order Book Entities
//!
//! Market depth snapshots recorded per exchange/pair.
//!
//! This module provides:
//! - [`DepthOrder`]: one price level of a book side
//! - [`OrderBook`]: a full snapshot submitted for storage
//! - [`OrderBookDepth`]: the `(asks, bids)` pair returned on lookup
//!
//! # Examples
//!
//! ```
//! use rust_decimal::Decimal;
//! use statistics_service::domain::entities::order_book::{DepthOrder, OrderBook};
//!
//! let book = OrderBook::new("Binance", "BTC_USD")
//!     .with_asks(vec![DepthOrder::new(Decimal::from(10000), Decimal::ONE)])
//!     .with_bids(vec![DepthOrder::new(Decimal::from(9500), Decimal::ONE)]);
//!
//! assert_eq!(book.depth().asks.len(), 1);
//! assert_eq!(book.to_string(), "OrderBook(Binance:BTC_USD asks=1 bids=1)");
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One price level of an order book side.
///
/// Has no identity of its own; it only lives inside an [`OrderBook`]
/// snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthOrder {
    /// Price of the level.
    pub price: Decimal,
    /// Quantity available at this price, in base asset units.
    pub base_qty: Decimal,
}

impl DepthOrder {
    /// Creates a new depth level.
    #[must_use]
    pub const fn new(price: Decimal, base_qty: Decimal) -> Self {
        Self { price, base_qty }
    }
}

impl fmt::Display for DepthOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.base_qty, self.price)
    }
}

/// Asks and bids of a stored snapshot.
///
/// Asks are ascending by price and bids descending by convention; the
/// order is whatever the producer submitted and is preserved as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookDepth {
    /// Sell side levels.
    pub asks: Vec<DepthOrder>,
    /// Buy side levels.
    pub bids: Vec<DepthOrder>,
}

impl OrderBookDepth {
    /// Creates a depth pair from both sides.
    #[must_use]
    pub fn new(asks: Vec<DepthOrder>, bids: Vec<DepthOrder>) -> Self {
        Self { asks, bids }
    }

    /// Returns an empty depth pair.
    ///
    /// Used as the response body when a lookup fails.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if both sides are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.asks.is_empty() && self.bids.is_empty()
    }

    /// Splits into `(asks, bids)`.
    #[must_use]
    pub fn into_parts(self) -> (Vec<DepthOrder>, Vec<DepthOrder>) {
        (self.asks, self.bids)
    }
}

/// A market depth snapshot for one exchange/pair.
///
/// Identity is the `(exchange, pair)` key. Every save is an independent
/// append; lookups return the most recently stored snapshot for the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    /// Exchange name, e.g. `Binance`.
    pub exchange: String,
    /// Trading pair, e.g. `BTC_USD`.
    pub pair: String,
    /// Sell side levels.
    #[serde(default)]
    pub asks: Vec<DepthOrder>,
    /// Buy side levels.
    #[serde(default)]
    pub bids: Vec<DepthOrder>,
}

impl OrderBook {
    /// Creates an empty snapshot for the given key.
    #[must_use]
    pub fn new(exchange: impl Into<String>, pair: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            pair: pair.into(),
            asks: Vec::new(),
            bids: Vec::new(),
        }
    }

    /// Sets the ask levels.
    #[must_use]
    pub fn with_asks(mut self, asks: Vec<DepthOrder>) -> Self {
        self.asks = asks;
        self
    }

    /// Sets the bid levels.
    #[must_use]
    pub fn with_bids(mut self, bids: Vec<DepthOrder>) -> Self {
        self.bids = bids;
        self
    }

    /// Returns a copy of the asks and bids.
    #[must_use]
    pub fn depth(&self) -> OrderBookDepth {
        OrderBookDepth::new(self.asks.clone(), self.bids.clone())
    }
}

impl fmt::Display for OrderBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OrderBook({}:{} asks={} bids={})",
            self.exchange,
            self.pair,
            self.asks.len(),
            self.bids.len()
        )
    }
}
