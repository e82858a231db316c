//! PostgreSQL store tests against a throwaway container.
//!
//! Ignored by default because they need Docker:
//!
//! ```text
//! cargo test --test postgres_store -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use statistics_service::application::context::{Interrupted, RequestContext};
use statistics_service::config::DatabaseConfig;
use statistics_service::domain::entities::{Client, DepthOrder, HistoryOrder, OrderBook};
use statistics_service::domain::value_objects::OrderSide;
use statistics_service::infrastructure::persistence::postgres::{
    PostgresStatisticsStore, connect_pool, run_migrations,
};
use statistics_service::infrastructure::persistence::{
    ClientConflictPolicy, StatisticsStore, StoreError,
};
use std::time::{Duration, Instant};
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

struct TestDatabase {
    // Held so the container outlives the pool.
    _container: ContainerAsync<GenericImage>,
    pool: PgPool,
}

async fn start_database() -> TestDatabase {
    let container = GenericImage::new("postgres", "16-alpine")
        .with_exposed_port(5432.tcp())
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .start()
        .await
        .expect("postgres container should start");

    let config = DatabaseConfig {
        host: container.get_host().await.unwrap().to_string(),
        port: container.get_host_port_ipv4(5432).await.unwrap(),
        password: "postgres".to_string(),
        max_connections: 4,
        ..DatabaseConfig::default()
    };

    // The entrypoint restarts the server once after initdb.
    let mut attempts = 0;
    let pool = loop {
        match connect_pool(&config).await {
            Ok(pool) => break pool,
            Err(e) if attempts < 20 => {
                attempts += 1;
                eprintln!("waiting for postgres: {e}");
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
            Err(e) => panic!("postgres never became ready: {e}"),
        }
    };
    run_migrations(&pool).await.unwrap();

    TestDatabase {
        _container: container,
        pool,
    }
}

fn ctx() -> RequestContext {
    RequestContext::with_timeout(Duration::from_secs(10))
}

fn level(price: i64, qty: i64) -> DepthOrder {
    DepthOrder::new(Decimal::from(price), Decimal::from(qty))
}

fn client() -> Client {
    Client::new("c1", "Binance", "algo1", "BTC_USD")
}

fn order(client: &Client, price: i64) -> HistoryOrder {
    HistoryOrder::new(client, OrderSide::Buy, "limit", Decimal::TWO, Decimal::from(price))
        .with_algorithm("twap")
        .with_bounds(Decimal::new(98105, 1), Decimal::new(97950, 1))
        .with_commission(Decimal::new(25, 2))
        .with_time_placed(Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap())
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires docker"]
async fn order_book_round_trip_returns_latest_snapshot() {
    let db = start_database().await;
    let store = PostgresStatisticsStore::new(db.pool.clone());

    let err = store
        .get_order_book(&ctx(), "Kraken", "ETH_USD")
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::not_found("Kraken", "ETH_USD"));

    let first = OrderBook::new("Binance", "BTC_USD")
        .with_asks(vec![level(10000, 1)])
        .with_bids(vec![level(9500, 1)]);
    store.save_order_book(&ctx(), &first).await.unwrap();

    let depth = store
        .get_order_book(&ctx(), "Binance", "BTC_USD")
        .await
        .unwrap();
    assert_eq!(depth.asks, vec![level(10000, 1)]);
    assert_eq!(depth.bids, vec![level(9500, 1)]);

    let second = OrderBook::new("Binance", "BTC_USD")
        .with_asks(vec![level(10100, 3), level(10200, 5)])
        .with_bids(vec![level(9900, 2)]);
    store.save_order_book(&ctx(), &second).await.unwrap();

    let depth = store
        .get_order_book(&ctx(), "Binance", "BTC_USD")
        .await
        .unwrap();
    assert_eq!(depth, second.depth());
    assert_eq!(count(&db.pool, "OrderBook").await, 2);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn history_is_append_only_in_insertion_order() {
    let db = start_database().await;
    let store = PostgresStatisticsStore::new(db.pool.clone());

    let history = store.get_order_history(&ctx(), &client()).await.unwrap();
    assert!(history.is_empty());

    let first = order(&client(), 9800);
    let second = order(&client(), 9700);
    store.save_order(&ctx(), &client(), &first).await.unwrap();
    store.save_order(&ctx(), &client(), &second).await.unwrap();

    let other = Client::new("c1", "Binance", "algo2", "BTC_USD");
    store
        .save_order(&ctx(), &other, &order(&other, 1))
        .await
        .unwrap();

    let history = store.get_order_history(&ctx(), &client()).await.unwrap();
    assert_eq!(history, vec![first, second]);
    assert_eq!(count(&db.pool, "Client").await, 2);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn failed_order_insert_rolls_back_client() {
    let db = start_database().await;
    let store = PostgresStatisticsStore::new(db.pool.clone());

    let mut bad = order(&client(), 9800);
    bad.type_order = "x".repeat(33);

    let err = store.save_order(&ctx(), &client(), &bad).await.unwrap_err();

    assert!(err.is_write());
    assert_eq!(count(&db.pool, "Client").await, 0);
    assert_eq!(count(&db.pool, "HistoryOrder").await, 0);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn reject_policy_fails_duplicate_client_without_order() {
    let db = start_database().await;
    let store = PostgresStatisticsStore::new(db.pool.clone())
        .with_client_policy(ClientConflictPolicy::Reject);

    store
        .save_order(&ctx(), &client(), &order(&client(), 9800))
        .await
        .unwrap();
    let err = store
        .save_order(&ctx(), &client(), &order(&client(), 9700))
        .await
        .unwrap_err();

    assert!(err.is_write());
    assert_eq!(count(&db.pool, "HistoryOrder").await, 1);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn cancelled_context_is_reported() {
    let db = start_database().await;
    let store = PostgresStatisticsStore::new(db.pool.clone());
    let (ctx, handle) = RequestContext::cancellable();
    handle.cancel();

    let err = store
        .save_order(&ctx, &client(), &order(&client(), 9800))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        StoreError::cancelled("save_order", client().to_string(), Interrupted::Cancelled)
    );
    assert_eq!(count(&db.pool, "Client").await, 0);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn default_time_placed_reads_back_equal() {
    let db = start_database().await;
    let store = PostgresStatisticsStore::new(db.pool.clone());

    let order = HistoryOrder::new(
        &client(),
        OrderSide::Buy,
        "limit",
        Decimal::TWO,
        Decimal::from(9800),
    );
    store.save_order(&ctx(), &client(), &order).await.unwrap();

    let history = store.get_order_history(&ctx(), &client()).await.unwrap();
    assert_eq!(history, vec![order]);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn deadline_aborts_blocked_save_and_pool_recovers() {
    let db = start_database().await;
    let store = PostgresStatisticsStore::new(db.pool.clone());
    let blocked = Client::new("c2", "Binance", "algo1", "BTC_USD");

    let mut lock = db.pool.begin().await.unwrap();
    sqlx::query("LOCK TABLE Client IN ACCESS EXCLUSIVE MODE")
        .execute(&mut *lock)
        .await
        .unwrap();

    let started = Instant::now();
    let err = store
        .save_order(
            &RequestContext::with_timeout(Duration::from_millis(300)),
            &blocked,
            &order(&blocked, 9800),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        StoreError::cancelled(
            "save_order",
            blocked.to_string(),
            Interrupted::DeadlineExceeded
        )
    );
    assert!(started.elapsed() < Duration::from_secs(5));

    lock.rollback().await.unwrap();
    assert_eq!(count(&db.pool, "Client").await, 0);

    for price in 0..10 {
        let book = OrderBook::new("Binance", "BTC_USD").with_asks(vec![level(price, 1)]);
        store.save_order_book(&ctx(), &book).await.unwrap();
    }
    store
        .save_order(&ctx(), &client(), &order(&client(), 9700))
        .await
        .unwrap();
    assert_eq!(count(&db.pool, "OrderBook").await, 10);
    assert_eq!(count(&db.pool, "HistoryOrder").await, 1);
}
