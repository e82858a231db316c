//! # API Layer
//!
//! HTTP transport for the statistics service.

pub mod rest;
