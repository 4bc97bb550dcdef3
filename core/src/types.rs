//! Shared primitive types used across every pipeline stage.

use chrono::NaiveDateTime;

/// A parsed ticket timestamp. Source data carries no zone information.
pub type Timestamp = NaiveDateTime;

/// A canonical (trimmed, lower-case, underscore-separated) column name.
pub type ColumnName = String;

/// A cell that may hold the missing marker.
pub type Cell = Option<String>;

/// Sentinel operator assigned when a ticket carries no operator.
pub const UNKNOWN_OPERATOR: &str = "UNKNOWN";
