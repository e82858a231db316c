//! # Statistics Service
//!
//! Entry point consumed by the API layer.
//!
//! [`StatisticsService`] forwards each call to the configured
//! [`StatisticsStore`] and wraps failures with the service operation that
//! hit them. It holds no state besides the store handle, does not retry
//! and does not validate; the store is swapped for the in-memory
//! implementation in tests.

use crate::application::context::RequestContext;
use crate::application::error::{ApplicationError, ApplicationResult, ServiceOperation};
use crate::domain::entities::{Client, HistoryOrder, OrderBook, OrderBookDepth};
use crate::infrastructure::persistence::StatisticsStore;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Stateless facade over a [`StatisticsStore`].
#[derive(Clone)]
pub struct StatisticsService {
    store: Arc<dyn StatisticsStore>,
}

impl fmt::Debug for StatisticsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatisticsService")
            .field("store", &self.store)
            .finish()
    }
}

impl StatisticsService {
    /// Creates a service backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn StatisticsStore>) -> Self {
        Self { store }
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn StatisticsStore> {
        &self.store
    }

    /// Returns the latest order book depth for `exchange`/`pair`.
    ///
    /// Callers rendering a response on failure should fall back to
    /// [`OrderBookDepth::empty`].
    ///
    /// # Errors
    ///
    /// Returns the store error wrapped as [`ServiceOperation::GetOrderBook`].
    pub async fn get_order_book(
        &self,
        ctx: &RequestContext,
        exchange: &str,
        pair: &str,
    ) -> ApplicationResult<OrderBookDepth> {
        debug!(exchange, pair, "Retrieving order book");

        self.store
            .get_order_book(ctx, exchange, pair)
            .await
            .map_err(|e| {
                warn!(exchange, pair, error = %e, "Failed to retrieve order book");
                ApplicationError::store(ServiceOperation::GetOrderBook, e)
            })
    }

    /// Persists an order book snapshot.
    ///
    /// # Errors
    ///
    /// Returns the store error wrapped as [`ServiceOperation::SaveOrderBook`].
    pub async fn save_order_book(
        &self,
        ctx: &RequestContext,
        order_book: &OrderBook,
    ) -> ApplicationResult<()> {
        debug!(
            exchange = %order_book.exchange,
            pair = %order_book.pair,
            asks = order_book.asks.len(),
            bids = order_book.bids.len(),
            "Saving order book"
        );

        self.store
            .save_order_book(ctx, order_book)
            .await
            .map_err(|e| {
                warn!(
                    exchange = %order_book.exchange,
                    pair = %order_book.pair,
                    error = %e,
                    "Failed to save order book"
                );
                ApplicationError::store(ServiceOperation::SaveOrderBook, e)
            })
    }

    /// Returns every order saved for `client`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns the store error wrapped as [`ServiceOperation::GetOrderHistory`].
    pub async fn get_order_history(
        &self,
        ctx: &RequestContext,
        client: &Client,
    ) -> ApplicationResult<Vec<HistoryOrder>> {
        debug!(client_name = %client.client_name, pair = %client.pair, "Retrieving order history");

        self.store
            .get_order_history(ctx, client)
            .await
            .map_err(|e| {
                warn!(client = %client, error = %e, "Failed to retrieve order history");
                ApplicationError::store(ServiceOperation::GetOrderHistory, e)
            })
    }

    /// Persists `client` and `order` as one unit.
    ///
    /// # Errors
    ///
    /// Returns the store error wrapped as [`ServiceOperation::SaveOrder`].
    pub async fn save_order(
        &self,
        ctx: &RequestContext,
        client: &Client,
        order: &HistoryOrder,
    ) -> ApplicationResult<()> {
        debug!(
            client_name = %client.client_name,
            pair = %client.pair,
            side = %order.side,
            "Saving order"
        );

        self.store
            .save_order(ctx, client, order)
            .await
            .map_err(|e| {
                warn!(client = %client, error = %e, "Failed to save order");
                ApplicationError::store(ServiceOperation::SaveOrder, e)
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::application::context::Interrupted;
    use crate::domain::entities::DepthOrder;
    use crate::domain::value_objects::OrderSide;
    use crate::infrastructure::persistence::in_memory::InMemoryStatisticsStore;
    use crate::infrastructure::persistence::{StoreError, StoreResult, book_key};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::time::Duration;

    /// Store whose every operation fails with the given error.
    #[derive(Debug)]
    struct FailingStore {
        error: StoreError,
    }

    #[async_trait]
    impl StatisticsStore for FailingStore {
        async fn get_order_book(
            &self,
            _ctx: &RequestContext,
            _exchange: &str,
            _pair: &str,
        ) -> StoreResult<OrderBookDepth> {
            Err(self.error.clone())
        }

        async fn save_order_book(
            &self,
            _ctx: &RequestContext,
            _order_book: &OrderBook,
        ) -> StoreResult<()> {
            Err(self.error.clone())
        }

        async fn get_order_history(
            &self,
            _ctx: &RequestContext,
            _client: &Client,
        ) -> StoreResult<Vec<HistoryOrder>> {
            Err(self.error.clone())
        }

        async fn save_order(
            &self,
            _ctx: &RequestContext,
            _client: &Client,
            _order: &HistoryOrder,
        ) -> StoreResult<()> {
            Err(self.error.clone())
        }
    }

    fn in_memory_service() -> StatisticsService {
        StatisticsService::new(Arc::new(InMemoryStatisticsStore::new()))
    }

    fn failing_service(error: StoreError) -> StatisticsService {
        StatisticsService::new(Arc::new(FailingStore { error }))
    }

    fn ctx() -> RequestContext {
        RequestContext::with_timeout(Duration::from_secs(5))
    }

    fn level(price: i64, qty: i64) -> DepthOrder {
        DepthOrder::new(Decimal::from(price), Decimal::from(qty))
    }

    fn client() -> Client {
        Client::new("c1", "Binance", "algo1", "BTC_USD")
    }

    #[tokio::test]
    async fn saved_order_book_is_returned() {
        let service = in_memory_service();
        let book = OrderBook::new("Binance", "BTC_USD")
            .with_asks(vec![level(10000, 1)])
            .with_bids(vec![level(9500, 1)]);

        service.save_order_book(&ctx(), &book).await.unwrap();
        let depth = service
            .get_order_book(&ctx(), "Binance", "BTC_USD")
            .await
            .unwrap();

        assert_eq!(depth.asks, vec![level(10000, 1)]);
        assert_eq!(depth.bids, vec![level(9500, 1)]);
    }

    #[tokio::test]
    async fn missing_order_book_is_not_found() {
        let service = in_memory_service();

        let err = service
            .get_order_book(&ctx(), "Kraken", "ETH_USD")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(err.is_client_retryable());
        assert!(err.to_string().starts_with("error retrieving order book: "));
    }

    #[tokio::test]
    async fn saved_order_is_in_history() {
        let service = in_memory_service();
        let order = HistoryOrder::new(
            &client(),
            OrderSide::Buy,
            "limit",
            Decimal::TWO,
            Decimal::from(9800),
        );

        service.save_order(&ctx(), &client(), &order).await.unwrap();
        let history = service.get_order_history(&ctx(), &client()).await.unwrap();

        assert_eq!(history, vec![order]);
    }

    #[tokio::test]
    async fn unknown_client_has_empty_history() {
        let service = in_memory_service();
        let history = service.get_order_history(&ctx(), &client()).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn store_errors_are_wrapped_per_operation() {
        let cause = StoreError::write("save_order", client().to_string(), "connection reset");
        let service = failing_service(cause.clone());
        let order = HistoryOrder::new(&client(), OrderSide::Sell, "market", Decimal::ONE, Decimal::ONE);

        let err = service.save_order(&ctx(), &client(), &order).await.unwrap_err();
        assert_eq!(err, ApplicationError::store(ServiceOperation::SaveOrder, cause.clone()));
        assert!(err.to_string().starts_with("error saving order: "));
        assert!(err.is_server_fault());

        let err = service
            .save_order_book(&ctx(), &OrderBook::new("Binance", "BTC_USD"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApplicationError::store(ServiceOperation::SaveOrderBook, cause.clone())
        );

        let err = service.get_order_history(&ctx(), &client()).await.unwrap_err();
        assert_eq!(
            err,
            ApplicationError::store(ServiceOperation::GetOrderHistory, cause)
        );
    }

    #[tokio::test]
    async fn query_failure_on_order_book_is_server_fault() {
        let service = failing_service(StoreError::query(
            "get_order_book",
            book_key("Binance", "BTC_USD"),
            "connection refused",
        ));

        let err = service
            .get_order_book(&ctx(), "Binance", "BTC_USD")
            .await
            .unwrap_err();

        assert!(err.is_server_fault());
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn expired_context_is_cancelled() {
        let service = in_memory_service();
        let ctx = RequestContext::with_timeout(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(1)).await;

        let err = service
            .get_order_history(&ctx, &client())
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(
            err.store_error(),
            Some(&StoreError::cancelled(
                "get_order_history",
                client().to_string(),
                Interrupted::DeadlineExceeded
            ))
        );
    }
}
