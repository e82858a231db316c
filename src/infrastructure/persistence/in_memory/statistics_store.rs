//! # In-Memory Statistics Store
//!
//! In-memory implementation of [`StatisticsStore`] for testing.
//!
//! Mirrors the relational adapter's observable behaviour: append-only
//! order book snapshots with latest-wins lookup, insertion-ordered
//! history, column width limits, the client foreign key, the configured
//! [`ClientConflictPolicy`], and all-or-nothing `save_order`.

use crate::application::context::RequestContext;
use crate::domain::entities::{Client, HistoryOrder, OrderBook, OrderBookDepth};
use crate::infrastructure::persistence::schema::{
    NAME_COLUMN_WIDTH, ORDER_TYPE_COLUMN_WIDTH, check_width,
};
use crate::infrastructure::persistence::traits::{
    ClientConflictPolicy, StatisticsStore, StoreError, StoreResult, book_key,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    order_books: HashMap<(String, String), Vec<OrderBook>>,
    clients: HashSet<Client>,
    history: Vec<HistoryOrder>,
}

/// In-memory implementation of [`StatisticsStore`].
///
/// Uses a thread-safe map for storage. Suitable for unit tests without
/// database dependencies.
#[derive(Debug, Clone)]
pub struct InMemoryStatisticsStore {
    tables: Arc<RwLock<Tables>>,
    client_policy: ClientConflictPolicy,
}

impl InMemoryStatisticsStore {
    /// Creates a new empty store with the default client conflict policy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            client_policy: ClientConflictPolicy::default(),
        }
    }

    /// Sets how re-saving a known client is treated.
    #[must_use]
    pub fn with_client_policy(mut self, policy: ClientConflictPolicy) -> Self {
        self.client_policy = policy;
        self
    }

    /// Returns the configured client conflict policy.
    #[must_use]
    pub fn client_policy(&self) -> ClientConflictPolicy {
        self.client_policy
    }

    /// Returns the number of stored order book snapshots.
    #[must_use]
    pub fn snapshot_count(&self) -> usize {
        self.tables
            .try_read()
            .map(|t| t.order_books.values().map(Vec::len).sum::<usize>())
            .unwrap_or(0)
    }

    /// Returns the number of stored clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.tables
            .try_read()
            .map(|t| t.clients.len())
            .unwrap_or(0)
    }

    /// Returns the number of stored history orders.
    #[must_use]
    pub fn history_count(&self) -> usize {
        self.tables
            .try_read()
            .map(|t| t.history.len())
            .unwrap_or(0)
    }

    /// Returns true if the client row exists.
    pub async fn contains_client(&self, client: &Client) -> bool {
        self.tables.read().await.clients.contains(client)
    }

    /// Removes everything from the store.
    pub async fn clear(&self) {
        let mut tables = self.tables.write().await;
        *tables = Tables::default();
    }
}

impl Default for InMemoryStatisticsStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_client(client: &Client) -> Option<String> {
    check_width("client_name", &client.client_name, NAME_COLUMN_WIDTH)
        .or_else(|| check_width("exchange_name", &client.exchange_name, NAME_COLUMN_WIDTH))
        .or_else(|| check_width("label", &client.label, NAME_COLUMN_WIDTH))
        .or_else(|| check_width("pair", &client.pair, NAME_COLUMN_WIDTH))
}

fn check_order(order: &HistoryOrder) -> Option<String> {
    check_client(&order.client())
        .or_else(|| check_width("type", &order.type_order, ORDER_TYPE_COLUMN_WIDTH))
        .or_else(|| {
            check_width(
                "algorithm_name_placed",
                &order.algorithm_name_placed,
                NAME_COLUMN_WIDTH,
            )
        })
}

#[async_trait]
impl StatisticsStore for InMemoryStatisticsStore {
    async fn get_order_book(
        &self,
        ctx: &RequestContext,
        exchange: &str,
        pair: &str,
    ) -> StoreResult<OrderBookDepth> {
        const OP: &str = "get_order_book";
        let lookup = async {
            let tables = self.tables.read().await;
            tables
                .order_books
                .get(&(exchange.to_string(), pair.to_string()))
                .and_then(|snapshots| snapshots.last())
                .map(OrderBook::depth)
        };

        ctx.run(lookup)
            .await
            .map_err(|cause| StoreError::cancelled(OP, book_key(exchange, pair), cause))?
            .ok_or_else(|| StoreError::not_found(exchange, pair))
    }

    async fn save_order_book(
        &self,
        ctx: &RequestContext,
        order_book: &OrderBook,
    ) -> StoreResult<()> {
        const OP: &str = "save_order_book";
        let key = book_key(&order_book.exchange, &order_book.pair);

        let insert = async {
            if let Some(msg) = check_width("exchange", &order_book.exchange, NAME_COLUMN_WIDTH)
                .or_else(|| check_width("pair", &order_book.pair, NAME_COLUMN_WIDTH))
            {
                return Err(StoreError::write(OP, key.clone(), msg));
            }

            let mut tables = self.tables.write().await;
            tables
                .order_books
                .entry((order_book.exchange.clone(), order_book.pair.clone()))
                .or_default()
                .push(order_book.clone());
            Ok(())
        };

        ctx.run(insert)
            .await
            .map_err(|cause| StoreError::cancelled(OP, key.clone(), cause))?
    }

    async fn get_order_history(
        &self,
        ctx: &RequestContext,
        client: &Client,
    ) -> StoreResult<Vec<HistoryOrder>> {
        const OP: &str = "get_order_history";
        let lookup = async {
            let tables = self.tables.read().await;
            tables
                .history
                .iter()
                .filter(|order| order.belongs_to(client))
                .cloned()
                .collect::<Vec<_>>()
        };

        ctx.run(lookup)
            .await
            .map_err(|cause| StoreError::cancelled(OP, client.to_string(), cause))
    }

    async fn save_order(
        &self,
        ctx: &RequestContext,
        client: &Client,
        order: &HistoryOrder,
    ) -> StoreResult<()> {
        const OP: &str = "save_order";
        let key = client.to_string();

        let transaction = async {
            let mut tables = self.tables.write().await;

            // Stage both rows; nothing is applied until every check passes.
            if let Some(msg) = check_client(client) {
                return Err(StoreError::write(OP, key.clone(), msg));
            }
            let client_exists = tables.clients.contains(client);
            if client_exists && self.client_policy == ClientConflictPolicy::Reject {
                return Err(StoreError::write(
                    OP,
                    key.clone(),
                    "duplicate key value violates unique constraint on Client",
                ));
            }

            if let Some(msg) = check_order(order) {
                return Err(StoreError::write(OP, key.clone(), msg));
            }
            let owner = order.client();
            if &owner != client && !tables.clients.contains(&owner) {
                return Err(StoreError::write(
                    OP,
                    key.clone(),
                    "insert on HistoryOrder violates foreign key constraint on Client",
                ));
            }

            if !client_exists {
                tables.clients.insert(client.clone());
            }
            tables.history.push(order.clone());
            Ok(())
        };

        ctx.run(transaction)
            .await
            .map_err(|cause| StoreError::cancelled(OP, key.clone(), cause))?
    }
}
