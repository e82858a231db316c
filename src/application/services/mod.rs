//! # Application Services
//!
//! Services that orchestrate infrastructure on behalf of the API layer.
//!
//! - [`StatisticsService`]: Order book and order history access

pub mod statistics;

pub use statistics::StatisticsService;
