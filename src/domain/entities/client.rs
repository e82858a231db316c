//! # Client Entity
//!
//! Composite identity under which history orders are grouped.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity tuple of an observed trading account.
///
/// A client has no lifecycle of its own: it is written alongside every
/// saved order and only serves as the lookup key for order history.
/// Lookups match all four fields exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Client {
    /// Account name.
    pub client_name: String,
    /// Exchange the account trades on.
    pub exchange_name: String,
    /// Free-form grouping tag, usually the strategy name.
    pub label: String,
    /// Trading pair.
    pub pair: String,
}

impl Client {
    /// Creates a client key.
    #[must_use]
    pub fn new(
        client_name: impl Into<String>,
        exchange_name: impl Into<String>,
        label: impl Into<String>,
        pair: impl Into<String>,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            exchange_name: exchange_name.into(),
            label: label.into(),
            pair: pair.into(),
        }
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "client_name={} exchange_name={} label={} pair={}",
            self.client_name, self.exchange_name, self.label, self.pair
        )
    }
}
