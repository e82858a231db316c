//! # Relational Schema
//!
//! Column limits of the tables created by
//! `migrations/20240601000000_create_statistics_tables.sql`.
//!
//! The in-memory store enforces the same limits so that writes which the
//! database would reject also fail in tests.

/// Width of the `VARCHAR` key and name columns.
pub const NAME_COLUMN_WIDTH: usize = 64;

/// Width of the `HistoryOrder.type` column.
pub const ORDER_TYPE_COLUMN_WIDTH: usize = 32;

/// Returns an error message if `value` does not fit a `VARCHAR(width)`
/// column.
#[must_use]
pub fn check_width(column: &str, value: &str, width: usize) -> Option<String> {
    let len = value.chars().count();
    (len > width).then(|| {
        format!("value too long for column {column}: {len} characters, limit {width}")
    })
}
