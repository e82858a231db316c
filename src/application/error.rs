//! # Application Errors
//!
//! Error types for the application layer.
//!
//! Store failures are wrapped with the service operation that hit them;
//! the store error itself is forwarded unchanged as the source.
//!
//! # Error Hierarchy
//!
//! ```text
//! ApplicationError
//! ├── Store { operation, source: StoreError }  - Persistence failures
//! └── Validation(String)                       - Malformed requests
//! ```
//!
//! # Examples
//!
//! ```
//! use statistics_service::application::error::{ApplicationError, ServiceOperation};
//! use statistics_service::infrastructure::persistence::StoreError;
//!
//! let err = ApplicationError::store(
//!     ServiceOperation::GetOrderBook,
//!     StoreError::not_found("Kraken", "ETH_USD"),
//! );
//! assert!(err.is_not_found());
//! assert!(err.to_string().starts_with("error retrieving order book:"));
//! ```

use crate::infrastructure::persistence::StoreError;
use std::fmt;
use thiserror::Error;

/// Service operation a failure occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceOperation {
    /// Reading the latest order book.
    GetOrderBook,
    /// Persisting an order book snapshot.
    SaveOrderBook,
    /// Reading a client's order history.
    GetOrderHistory,
    /// Persisting a client and one of its orders.
    SaveOrder,
}

impl ServiceOperation {
    /// Returns the label used in error messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GetOrderBook => "retrieving order book",
            Self::SaveOrderBook => "saving order book",
            Self::GetOrderHistory => "retrieving order history",
            Self::SaveOrder => "saving order",
        }
    }
}

impl fmt::Display for ServiceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application layer error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplicationError {
    /// The store failed.
    #[error("error {operation}: {source}")]
    Store {
        /// Operation that failed.
        operation: ServiceOperation,
        /// Underlying store error.
        source: StoreError,
    },

    /// Input validation failed.
    #[error("validation error: {0}")]
    Validation(String),
}

impl ApplicationError {
    /// Wraps a store error with the failing operation.
    #[must_use]
    pub fn store(operation: ServiceOperation, source: StoreError) -> Self {
        Self::Store { operation, source }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns the wrapped store error, if any.
    #[must_use]
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }

    /// Returns true if no matching row exists.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.store_error().is_some_and(StoreError::is_not_found)
    }

    /// Returns true if the request context was cancelled or expired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.store_error().is_some_and(StoreError::is_cancelled)
    }

    /// Returns true for validation failures.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if the caller may retry (not found or interrupted).
    #[must_use]
    pub fn is_client_retryable(&self) -> bool {
        self.store_error()
            .is_some_and(StoreError::is_client_retryable)
    }

    /// Returns true for query and write failures.
    #[must_use]
    pub fn is_server_fault(&self) -> bool {
        self.store_error()
            .is_some_and(|e| e.is_query() || e.is_write())
    }
}

/// Result type for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
