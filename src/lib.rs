//! rtgrid - grid tables inside flat rich-text documents
//!
//! Tables live in the document as ordinary lines whose attributes carry the
//! structure (table, row and column ids, spans, widths). This crate reads
//! them back into a grid, edits the grid and answers with one reversible
//! patch per operation:
//! - Insert/remove rows and columns, merge and split cells
//! - Repair of grids broken by outside edits
//! - Pointer selection that always closes over merged cells
//! - Structural paste, HTML import and export
//! - Drag reordering of rows and columns
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init, { TableEditorHandle } from 'rtgrid';
//! await init();
//! const editor = new TableEditorHandle(null, { maxRows: 30 });
//! editor.set_change_callback((patch) => quill.updateContents(patch));
//! const table = editor.insert_table(0, 3, 3, false);
//! ```

pub mod colors;
pub mod config;
pub mod delta;
pub mod document;
pub mod drag;
pub mod editor;
pub mod error;
pub mod grid;
pub mod html;
pub mod layout;
pub mod paste;
pub mod selection;
pub mod structure;
pub mod sync;
pub mod types;
pub mod wasm;

use wasm_bindgen::prelude::*;

pub use config::TableConfig;
pub use delta::{Delta, Op};
pub use document::{DocumentHost, MemoryDocument};
pub use editor::TableEditor;
pub use error::{Result, TableError};
pub use types::*;
pub use wasm::TableEditorHandle;

/// Import the first `<table>` of an HTML string and return it as document
/// runs (a delta of inserts), or `null` when there is no table.
///
/// # Errors
/// Returns an error if the HTML cannot be tokenized.
#[wasm_bindgen]
pub fn import_html_table(html: &str) -> std::result::Result<JsValue, JsValue> {
    let mut ids = IdGenerator::new();
    let table = html::import_table(html, &mut ids, &TableConfig::default())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let Some(table) = table else {
        return Ok(JsValue::NULL);
    };
    let delta = sync::table_delta(&table).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&delta)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
}

/// Get the library version
#[must_use]
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
