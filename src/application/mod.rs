//! # Application Layer
//!
//! Request context, service orchestration and application errors.

pub mod context;
pub mod error;
pub mod services;

pub use context::{CancelHandle, Interrupted, RequestContext};
pub use error::{ApplicationError, ApplicationResult, ServiceOperation};
pub use services::StatisticsService;
