//! # PostgreSQL Statistics Store
//!
//! PostgreSQL implementation of [`StatisticsStore`] using sqlx.
//!
//! Order book sides are stored as JSONB arrays of `{price, baseQty}`
//! objects. History orders and their client rows are written in one
//! transaction. Every statement uses positional parameter binding.

use crate::application::context::RequestContext;
use crate::domain::entities::history_order::TIME_PLACED_PRECISION;
use crate::domain::entities::{Client, DepthOrder, HistoryOrder, OrderBook, OrderBookDepth};
use crate::domain::value_objects::OrderSide;
use crate::infrastructure::persistence::traits::{
    ClientConflictPolicy, StatisticsStore, StoreError, StoreResult, book_key,
};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use futures::TryStreamExt;
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, warn};

const SELECT_LATEST_ORDER_BOOK: &str = r#"
    SELECT asks, bids
    FROM OrderBook
    WHERE exchange = $1 AND pair = $2
    ORDER BY id DESC
    LIMIT 1
"#;

const INSERT_ORDER_BOOK: &str = r#"
    INSERT INTO OrderBook (exchange, pair, asks, bids)
    VALUES ($1, $2, $3, $4)
"#;

const SELECT_ORDER_HISTORY: &str = r#"
    SELECT client_name, exchange_name, label, pair, side, type, base_qty, price,
           algorithm_name_placed, lowest_sell_prc, highest_buy_prc,
           commission_quote_qty, time_placed
    FROM HistoryOrder
    WHERE client_name = $1 AND exchange_name = $2 AND label = $3 AND pair = $4
    ORDER BY id ASC
"#;

const INSERT_CLIENT: &str = r#"
    INSERT INTO Client (client_name, exchange_name, label, pair)
    VALUES ($1, $2, $3, $4)
"#;

const INSERT_CLIENT_IGNORE_EXISTING: &str = r#"
    INSERT INTO Client (client_name, exchange_name, label, pair)
    VALUES ($1, $2, $3, $4)
    ON CONFLICT (client_name, exchange_name, label, pair) DO NOTHING
"#;

const INSERT_HISTORY_ORDER: &str = r#"
    INSERT INTO HistoryOrder (
        client_name, exchange_name, label, pair, side, type, base_qty, price,
        algorithm_name_placed, lowest_sell_prc, highest_buy_prc,
        commission_quote_qty, time_placed
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
"#;

/// PostgreSQL implementation of [`StatisticsStore`].
///
/// Uses connection pooling via `sqlx::PgPool`. The pool is built by the
/// caller and injected here; this type never opens connections on its
/// own.
///
/// # Examples
///
/// ```ignore
/// use sqlx::PgPool;
/// use statistics_service::infrastructure::persistence::postgres::PostgresStatisticsStore;
///
/// let pool = PgPool::connect("postgres://...").await?;
/// let store = PostgresStatisticsStore::new(pool);
/// ```
#[derive(Debug, Clone)]
pub struct PostgresStatisticsStore {
    pool: PgPool,
    client_policy: ClientConflictPolicy,
}

impl PostgresStatisticsStore {
    /// Creates a new PostgreSQL store with the default client conflict
    /// policy.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            client_policy: ClientConflictPolicy::default(),
        }
    }

    /// Sets how re-saving a known client is treated.
    #[must_use]
    pub fn with_client_policy(mut self, policy: ClientConflictPolicy) -> Self {
        self.client_policy = policy;
        self
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Returns the configured client conflict policy.
    #[must_use]
    pub fn client_policy(&self) -> ClientConflictPolicy {
        self.client_policy
    }
}

#[async_trait]
impl StatisticsStore for PostgresStatisticsStore {
    async fn get_order_book(
        &self,
        ctx: &RequestContext,
        exchange: &str,
        pair: &str,
    ) -> StoreResult<OrderBookDepth> {
        const OP: &str = "get_order_book";
        let key = book_key(exchange, pair);

        let query = sqlx::query_as::<_, (Json<Vec<DepthOrder>>, Json<Vec<DepthOrder>>)>(
            SELECT_LATEST_ORDER_BOOK,
        )
        .bind(exchange)
        .bind(pair)
        .fetch_optional(&self.pool);

        let row = ctx
            .run(query)
            .await
            .map_err(|cause| StoreError::cancelled(OP, key.clone(), cause))?
            .map_err(|e| read_error(OP, &key, &e))?;

        match row {
            Some((Json(asks), Json(bids))) => Ok(OrderBookDepth::new(asks, bids)),
            None => Err(StoreError::not_found(exchange, pair)),
        }
    }

    async fn save_order_book(
        &self,
        ctx: &RequestContext,
        order_book: &OrderBook,
    ) -> StoreResult<()> {
        const OP: &str = "save_order_book";
        let key = book_key(&order_book.exchange, &order_book.pair);

        let insert = sqlx::query(INSERT_ORDER_BOOK)
            .bind(&order_book.exchange)
            .bind(&order_book.pair)
            .bind(Json(&order_book.asks))
            .bind(Json(&order_book.bids))
            .execute(&self.pool);

        ctx.run(insert)
            .await
            .map_err(|cause| StoreError::cancelled(OP, key.clone(), cause))?
            .map_err(|e| write_error(OP, &key, &e))?;

        debug!(
            exchange = %order_book.exchange,
            pair = %order_book.pair,
            asks = order_book.asks.len(),
            bids = order_book.bids.len(),
            "order book persisted"
        );
        Ok(())
    }

    async fn get_order_history(
        &self,
        ctx: &RequestContext,
        client: &Client,
    ) -> StoreResult<Vec<HistoryOrder>> {
        const OP: &str = "get_order_history";
        let key = client.to_string();

        let drain = async {
            let mut rows = sqlx::query_as::<_, HistoryRow>(SELECT_ORDER_HISTORY)
                .bind(&client.client_name)
                .bind(&client.exchange_name)
                .bind(&client.label)
                .bind(&client.pair)
                .fetch(&self.pool);

            let mut orders = Vec::new();
            while let Some(row) = rows
                .try_next()
                .await
                .map_err(|e| read_error(OP, &key, &e))?
            {
                let order = history_order_from_row(row)
                    .map_err(|msg| StoreError::query(OP, key.clone(), msg))?;
                orders.push(order);
            }
            Ok::<_, StoreError>(orders)
        };

        ctx.run(drain)
            .await
            .map_err(|cause| StoreError::cancelled(OP, key.clone(), cause))?
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
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| write_error(OP, &key, &e))?;

            let inserted =
                insert_client_and_order(&mut *tx, self.client_policy, client, order).await;
            match inserted {
                Ok(()) => tx.commit().await.map_err(|e| write_error(OP, &key, &e)),
                Err(e) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!(
                            client = %client,
                            error = %rollback_err,
                            "rollback of failed order save failed"
                        );
                    }
                    Err(write_error(OP, &key, &e))
                }
            }
        };

        // An interrupted transaction is dropped uncommitted and rolls back.
        ctx.run(transaction)
            .await
            .map_err(|cause| StoreError::cancelled(OP, key.clone(), cause))??;

        debug!(client = %client, side = %order.side, "order persisted");
        Ok(())
    }
}

async fn insert_client_and_order(
    conn: &mut PgConnection,
    policy: ClientConflictPolicy,
    client: &Client,
    order: &HistoryOrder,
) -> Result<(), sqlx::Error> {
    let insert_client = match policy {
        ClientConflictPolicy::Ignore => INSERT_CLIENT_IGNORE_EXISTING,
        ClientConflictPolicy::Reject => INSERT_CLIENT,
    };

    sqlx::query(insert_client)
        .bind(&client.client_name)
        .bind(&client.exchange_name)
        .bind(&client.label)
        .bind(&client.pair)
        .execute(&mut *conn)
        .await?;

    sqlx::query(INSERT_HISTORY_ORDER)
        .bind(&order.client_name)
        .bind(&order.exchange_name)
        .bind(&order.label)
        .bind(&order.pair)
        .bind(order.side.as_str())
        .bind(&order.type_order)
        .bind(order.base_qty)
        .bind(order.price)
        .bind(&order.algorithm_name_placed)
        .bind(order.lowest_sell_prc)
        .bind(order.highest_buy_prc)
        .bind(order.commission_quote_qty)
        // Public fields may carry nanoseconds; the column keeps microseconds.
        .bind(order.time_placed.trunc_subsecs(TIME_PLACED_PRECISION))
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Row of [`SELECT_ORDER_HISTORY`], in column order.
type HistoryRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    Decimal,
    Decimal,
    String,
    Decimal,
    Decimal,
    Decimal,
    DateTime<Utc>,
);

fn history_order_from_row(row: HistoryRow) -> Result<HistoryOrder, String> {
    let (
        client_name,
        exchange_name,
        label,
        pair,
        side,
        type_order,
        base_qty,
        price,
        algorithm_name_placed,
        lowest_sell_prc,
        highest_buy_prc,
        commission_quote_qty,
        time_placed,
    ) = row;

    let side: OrderSide = side.parse().map_err(|e| format!("corrupt history row: {e}"))?;

    Ok(HistoryOrder {
        client_name,
        exchange_name,
        label,
        pair,
        side,
        type_order,
        base_qty,
        price,
        algorithm_name_placed,
        lowest_sell_prc,
        highest_buy_prc,
        commission_quote_qty,
        time_placed,
    })
}

/// Classifies a driver error raised while reading.
fn read_error(operation: &'static str, key: &str, err: &sqlx::Error) -> StoreError {
    StoreError::query(operation, key, describe(err))
}

/// Classifies a driver error raised while writing.
fn write_error(operation: &'static str, key: &str, err: &sqlx::Error) -> StoreError {
    StoreError::write(operation, key, describe(err))
}

/// Renders a driver error without the statement text.
fn describe(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db) => {
            let kind = if db.is_unique_violation() {
                "duplicate key"
            } else if db.is_foreign_key_violation() {
                "foreign key violation"
            } else if db.is_check_violation() {
                "check violation"
            } else {
                "database error"
            };
            match db.constraint() {
                Some(constraint) => format!("{kind} ({constraint}): {}", db.message()),
                None => format!("{kind}: {}", db.message()),
            }
        }
        sqlx::Error::PoolTimedOut => "timed out acquiring a pooled connection".to_string(),
        sqlx::Error::PoolClosed => "connection pool is closed".to_string(),
        sqlx::Error::ColumnDecode { index, source } => {
            format!("cannot decode column {index}: {source}")
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(side: &str) -> HistoryRow {
        (
            "c1".to_string(),
            "Binance".to_string(),
            "algo1".to_string(),
            "BTC_USD".to_string(),
            side.to_string(),
            "limit".to_string(),
            Decimal::TWO,
            Decimal::from(9800),
            "twap".to_string(),
            Decimal::from(9900),
            Decimal::from(9700),
            Decimal::new(5, 1),
            DateTime::from_timestamp(1_717_200_000, 0).unwrap(),
        )
    }

    #[test]
    fn maps_history_row_positionally() {
        let order = history_order_from_row(row("buy")).unwrap();
        assert_eq!(order.client(), Client::new("c1", "Binance", "algo1", "BTC_USD"));
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.type_order, "limit");
        assert_eq!(order.price, Decimal::from(9800));
        assert_eq!(order.lowest_sell_prc, Decimal::from(9900));
        assert_eq!(order.highest_buy_prc, Decimal::from(9700));
        assert_eq!(order.commission_quote_qty, Decimal::new(5, 1));
    }

    #[test]
    fn corrupt_side_is_reported() {
        let err = history_order_from_row(row("hold")).unwrap_err();
        assert!(err.contains("corrupt history row"));
        assert!(err.contains("hold"));
    }

    #[test]
    fn pool_timeout_is_classified_as_query_on_read() {
        let err = read_error("get_order_history", "client_name=c1", &sqlx::Error::PoolTimedOut);
        assert!(err.is_query());
        assert!(err.to_string().contains("timed out acquiring"));
    }

    #[test]
    fn write_errors_keep_operation_and_key() {
        let err = write_error(
            "save_order_book",
            &book_key("Binance", "BTC_USD"),
            &sqlx::Error::PoolClosed,
        );
        assert!(err.is_write());
        assert_eq!(
            err.to_string(),
            "write error in save_order_book (exchange=Binance pair=BTC_USD): connection pool is closed"
        );
    }

    #[test]
    fn row_not_found_is_not_leaked_as_sql() {
        let err = read_error("get_order_book", "exchange=a pair=b", &sqlx::Error::RowNotFound);
        assert!(!err.to_string().contains("SELECT"));
    }
}
