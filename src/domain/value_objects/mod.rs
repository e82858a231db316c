//! # Value Objects
//!
//! Immutable types with domain semantics.
//!
//! ## Domain Enums
//!
//! - [`OrderSide`]: Buy or Sell
//! - [`ParseEnumError`]: Error returned when parsing an enum from text

pub mod enums;

pub use enums::{OrderSide, ParseEnumError};
