//! # Domain Enums
//!
//! Enumeration types for domain concepts.
//!
//! - [`OrderSide`] - Buy or Sell direction of a history order
//!
//! Enums implement `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`,
//! `Display`, `FromStr`, and Serde traits. The `Display` form is the one
//! stored in the `side` column.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order side indicating buy or sell direction.
///
/// # Examples
///
/// ```
/// use statistics_service::domain::value_objects::enums::OrderSide;
///
/// let buy = OrderSide::Buy;
///
/// assert_eq!(buy.opposite(), OrderSide::Sell);
/// assert_eq!(buy.to_string(), "buy");
/// assert_eq!("SELL".parse::<OrderSide>().unwrap(), OrderSide::Sell);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buy order - acquiring the base asset.
    Buy,
    /// Sell order - disposing of the base asset.
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns true if this is a buy order.
    #[inline]
    #[must_use]
    pub const fn is_buy(self) -> bool {
        matches!(self, Self::Buy)
    }

    /// Returns true if this is a sell order.
    #[inline]
    #[must_use]
    pub const fn is_sell(self) -> bool {
        matches!(self, Self::Sell)
    }

    /// Returns the lowercase wire and column representation.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderSide {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            _ => Err(ParseEnumError::InvalidValue("OrderSide", s.to_string())),
        }
    }
}

/// Error type for parsing enum values from strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEnumError {
    /// The provided string value is not valid for the enum.
    InvalidValue(&'static str, String),
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue(enum_name, value) => {
                write!(f, "invalid {} value: '{}'", enum_name, value)
            }
        }
    }
}

impl std::error::Error for ParseEnumError {}
