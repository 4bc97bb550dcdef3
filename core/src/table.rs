//! Raw string-typed tables as supplied by the loader.
//!
//! RULE: column names are canonicalized exactly once, when a table enters
//! the pipeline. Stages look columns up by canonical name only.

use crate::types::{Cell, ColumnName};
use serde::{Deserialize, Serialize};

/// Cell contents treated as "no value" regardless of column.
const MISSING_TOKENS: &[&str] = &[
    "na", "n/a", "nan", "null", "none", "not available",
];

/// Trim, lower-case, and replace spaces with underscores.
pub fn canonical_column(name: &str) -> ColumnName {
    name.trim().to_lowercase().replace(' ', "_")
}

/// True when a cell carries no usable value.
pub fn is_missing(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || MISSING_TOKENS
            .iter()
            .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Convert a raw cell into a tagged optional value.
pub fn cell(value: &str) -> Cell {
    if is_missing(value) {
        None
    } else {
        Some(value.trim().to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<ColumnName>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(columns: Vec<ColumnName>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Build from string literals. Convenient for tests and fixtures.
    pub fn from_rows(columns: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// A copy with every column name canonicalized.
    pub fn canonicalized(&self) -> Self {
        Self {
            columns: self.columns.iter().map(|c| canonical_column(c)).collect(),
            rows: self.rows.clone(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Raw text at (row, column). Short rows read as empty.
    pub fn value(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Tagged cell at (row, column).
    pub fn cell(&self, row: usize, column: usize) -> Cell {
        cell(self.value(row, column))
    }
}

/// The six raw inputs of one pipeline run. Absent inputs are empty tables.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    pub service_data: RawTable,
    pub employees: RawTable,
    pub service_type: RawTable,
    pub channel: RawTable,
    pub fault_type: RawTable,
    pub location: RawTable,
}
