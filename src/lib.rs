//! # Statistics Service
//!
//! Records order-book snapshots and client order history for
//! exchange/pair combinations, backed by PostgreSQL.
//!
//! ## Layers
//!
//! - [`domain`]: Order books, clients, history orders
//! - [`application`]: Request context, [`StatisticsService`], errors
//! - [`infrastructure`]: The [`StatisticsStore`] contract, the PostgreSQL
//!   adapter and an in-memory store
//! - [`api`]: axum REST endpoints
//! - [`config`]: Layered configuration
//!
//! ## Flow
//!
//! ```text
//! HTTP -> api::rest -> StatisticsService -> StatisticsStore -> PostgreSQL
//! ```
//!
//! Every store call takes a [`RequestContext`]; an expired or cancelled
//! context aborts the in-flight query.
//!
//! [`StatisticsService`]: application::StatisticsService
//! [`StatisticsStore`]: infrastructure::persistence::StatisticsStore
//! [`RequestContext`]: application::RequestContext

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
