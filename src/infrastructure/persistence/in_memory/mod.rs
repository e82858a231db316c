//! # In-Memory Store
//!
//! In-memory implementation for testing without a database.
//!
//! ## Thread Safety
//!
//! Storage sits behind `Arc<RwLock<..>>`; `save_order` applies both rows
//! under a single write lock.

pub mod statistics_store;

pub use statistics_store::InMemoryStatisticsStore;
