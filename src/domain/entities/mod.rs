//! # Domain Entities
//!
//! Values recorded and returned by the statistics service.
//!
//! ## Order Books
//!
//! - [`OrderBook`]: Depth snapshot for one exchange/pair
//! - [`DepthOrder`]: One price level of a book side
//! - [`OrderBookDepth`]: Asks and bids returned on lookup
//!
//! ## Order History
//!
//! - [`Client`]: Composite identity of an observed account
//! - [`HistoryOrder`]: Append-only order record of a client

pub mod client;
pub mod history_order;
pub mod order_book;

pub use client::Client;
pub use history_order::HistoryOrder;
pub use order_book::{DepthOrder, OrderBook, OrderBookDepth};
