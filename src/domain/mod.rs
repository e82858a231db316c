//! # Domain Layer
//!
//! Entities and value objects shared by every layer.
//!
//! - [`entities`]: Order books, clients and history orders
//! - [`value_objects`]: Order side

pub mod entities;
pub mod value_objects;
