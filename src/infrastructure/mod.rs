//! # Infrastructure Layer
//!
//! Store implementations and database bootstrap.

pub mod persistence;
