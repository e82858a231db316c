//! # PostgreSQL Persistence
//!
//! Relational adapter for the statistics store.
//!
//! The pool is built once by the binary ([`connect_pool`]) and handed to
//! [`PostgresStatisticsStore::new`]; nothing here holds a global handle.

pub mod pool;
pub mod statistics_store;

pub use pool::{PoolError, connect_options, connect_pool, run_migrations};
pub use statistics_store::PostgresStatisticsStore;
