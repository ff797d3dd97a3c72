//! Structured error types for rtgrid.
//!
//! Only size/nesting violations are meant to reach the user. Routine
//! edge cases (empty or stale selections) are `Ok(None)` no-ops, and
//! structural inconsistencies are healed by the repair pass.

use crate::types::TableId;

/// All errors that can occur while reading or editing tables.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// Non-positive or over-limit row/column count on table creation.
    #[error("Invalid table size {rows}x{cols} (limit {max_rows}x{max_cols})")]
    InvalidSize {
        rows: usize,
        cols: usize,
        max_rows: usize,
        max_cols: usize,
    },

    /// Table creation at a disallowed location (e.g. inside a cell).
    #[error("Cannot insert a table here: {0}")]
    InvalidInsertionTarget(String),

    /// Operation given cells from two different tables.
    #[error("Selection spans tables {0} and {1}")]
    CrossTable(TableId, TableId),

    /// The referenced table is not present in the document.
    #[error("Table not found: {0}")]
    TableNotFound(TableId),

    /// An id references a row, column or table that does not exist.
    #[error("Missing ancestor: {0}")]
    MissingAncestor(String),

    /// A structural attribute could not be decoded.
    #[error("Malformed structural attribute: {0}")]
    Attribute(String),

    /// A patch does not fit the document it is applied to.
    #[error("Patch mismatch: {0}")]
    Patch(String),

    /// HTML parsing error from quick-xml.
    #[error("HTML parsing: {0}")]
    Html(#[from] quick_xml::Error),

    /// JSON (de)serialization error.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TableError>;

#[cfg(target_arch = "wasm32")]
impl From<TableError> for wasm_bindgen::JsValue {
    fn from(e: TableError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}
