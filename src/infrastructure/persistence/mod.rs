//! # Persistence Layer
//!
//! Store contract and its implementations.
//!
//! ## Store Trait (Port)
//!
//! - [`StatisticsStore`]: Order books and order history
//!
//! ## Implementations
//!
//! - `postgres`: Relational adapter over a `sqlx::PgPool`
//! - `in_memory`: In-memory implementation for tests

pub mod in_memory;
pub mod postgres;
pub mod schema;
pub mod traits;

pub use traits::{
    ClientConflictPolicy, StatisticsStore, StoreError, StoreResult, book_key,
};
