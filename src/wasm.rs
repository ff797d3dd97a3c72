//! JavaScript bindings.
//!
//! `TableEditorHandle` owns an in-memory document and a `TableEditor` over
//! it. Every mutating call returns the applied patch (or `null` for a
//! no-op) and passes it to the change callback, so the page can mirror it
//! into its own editor.

use js_sys::Function;
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::config::TableConfig;
use crate::delta::Delta;
use crate::document::{DocumentHost, MemoryDocument};
use crate::drag::Axis;
use crate::editor::TableEditor;
use crate::types::{Align, CaptionSide, CellRef, CellStyle, ColId, Point, RowId, TableId};

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn from_js<T: DeserializeOwned + Default>(value: JsValue) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(js_err)
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
}

#[derive(Serialize)]
struct CopiedCells<'a> {
    delta: &'a Delta,
    html: &'a str,
}

/// Table editor exported to JavaScript.
#[wasm_bindgen]
pub struct TableEditorHandle {
    editor: TableEditor<MemoryDocument>,
    on_change: Option<Function>,
}

impl TableEditorHandle {
    /// Report a patch to the change callback and hand it back to JS.
    fn emit(&self, patch: Option<Delta>) -> Result<JsValue, JsValue> {
        let Some(patch) = patch else {
            return Ok(JsValue::NULL);
        };
        let value = to_js(&patch)?;
        if let Some(callback) = &self.on_change {
            if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                log::warn!("change callback threw: {e:?}");
            }
        }
        Ok(value)
    }

    fn cells(value: JsValue) -> Result<Vec<CellRef>, JsValue> {
        from_js(value)
    }
}

#[wasm_bindgen]
impl TableEditorHandle {
    /// Create an editor over `contents` (a delta of inserts, or `null` for
    /// an empty document) with an optional `TableConfig` object.
    #[wasm_bindgen(constructor)]
    pub fn new(contents: JsValue, config: JsValue) -> Result<TableEditorHandle, JsValue> {
        console_error_panic_hook::set_once();

        let config: TableConfig = from_js(config)?;
        let document = if contents.is_undefined() || contents.is_null() {
            MemoryDocument::new()
        } else {
            MemoryDocument::from_delta(serde_wasm_bindgen::from_value(contents).map_err(js_err)?)
        };
        let editor = TableEditor::new(document, config).map_err(js_err)?;
        Ok(TableEditorHandle {
            editor,
            on_change: None,
        })
    }

    /// Register the function called with every applied patch.
    pub fn set_change_callback(&mut self, callback: Option<Function>) {
        self.on_change = callback;
    }

    pub fn contents(&self) -> Result<JsValue, JsValue> {
        to_js(self.editor.host().contents())
    }

    pub fn tables(&self) -> Result<JsValue, JsValue> {
        to_js(&self.editor.tables().map_err(js_err)?)
    }

    /// Apply a patch made outside the table engine, then repair tables.
    pub fn apply_external(&mut self, patch: JsValue) -> Result<JsValue, JsValue> {
        let patch: Delta = serde_wasm_bindgen::from_value(patch).map_err(js_err)?;
        self.editor.host_mut().apply(&patch).map_err(js_err)?;
        let repair = self.editor.on_external_change().map_err(js_err)?;
        self.emit(repair)
    }

    pub fn undo(&mut self) -> Result<JsValue, JsValue> {
        let patch = self.editor.host_mut().undo();
        self.emit(patch)
    }

    pub fn redo(&mut self) -> Result<JsValue, JsValue> {
        let patch = self.editor.host_mut().redo();
        self.emit(patch)
    }

    pub fn insert_table(&mut self, at: usize, rows: usize, cols: usize, full: bool) -> Result<String, JsValue> {
        let id = self.editor.insert_table(at, rows, cols, full).map_err(js_err)?;
        self.emit(self.editor.last_patch().cloned())?;
        Ok(id.0)
    }

    pub fn delete_table(&mut self, table: &str) -> Result<JsValue, JsValue> {
        let patch = self.editor.delete_table(&TableId::new(table)).map_err(js_err)?;
        self.emit(patch)
    }

    pub fn append_row(&mut self, cells: JsValue, after: bool) -> Result<JsValue, JsValue> {
        let patch = self.editor.append_row(&Self::cells(cells)?, after).map_err(js_err)?;
        self.emit(patch)
    }

    pub fn append_col(&mut self, cells: JsValue, after: bool) -> Result<JsValue, JsValue> {
        let patch = self.editor.append_col(&Self::cells(cells)?, after).map_err(js_err)?;
        self.emit(patch)
    }

    pub fn remove_row(&mut self, cells: JsValue) -> Result<JsValue, JsValue> {
        let patch = self.editor.remove_row(&Self::cells(cells)?).map_err(js_err)?;
        self.emit(patch)
    }

    pub fn remove_col(&mut self, cells: JsValue) -> Result<JsValue, JsValue> {
        let patch = self.editor.remove_col(&Self::cells(cells)?).map_err(js_err)?;
        self.emit(patch)
    }

    pub fn merge_cells(&mut self, cells: JsValue) -> Result<JsValue, JsValue> {
        let patch = self.editor.merge_cells(&Self::cells(cells)?).map_err(js_err)?;
        self.emit(patch)
    }

    pub fn split_cell(&mut self, cell: JsValue) -> Result<JsValue, JsValue> {
        let cell: CellRef = serde_wasm_bindgen::from_value(cell).map_err(js_err)?;
        let patch = self.editor.split_cell(&cell).map_err(js_err)?;
        self.emit(patch)
    }

    pub fn set_column_width(&mut self, table: &str, col: &str, width: f32) -> Result<JsValue, JsValue> {
        let patch = self
            .editor
            .set_column_width(&TableId::new(table), &ColId::new(col), width)
            .map_err(js_err)?;
        self.emit(patch)
    }

    pub fn set_row_height(&mut self, table: &str, row: &str, height: Option<f32>) -> Result<JsValue, JsValue> {
        let patch = self
            .editor
            .set_row_height(&TableId::new(table), &RowId::new(row), height)
            .map_err(js_err)?;
        self.emit(patch)
    }

    /// `style` is `{backgroundColor?, borderColor?, css?}`; an empty string
    /// clears a field.
    pub fn set_cell_style(&mut self, cells: JsValue, style: JsValue) -> Result<JsValue, JsValue> {
        let style: CellStyle = from_js(style)?;
        let patch = self
            .editor
            .set_cell_style(&Self::cells(cells)?, &style)
            .map_err(js_err)?;
        self.emit(patch)
    }

    /// `align` is `"left"`, `"center"` or `"right"`.
    pub fn set_alignment(&mut self, table: &str, align: JsValue) -> Result<JsValue, JsValue> {
        let align: Align = from_js(align)?;
        let patch = self
            .editor
            .set_alignment(&TableId::new(table), align)
            .map_err(js_err)?;
        self.emit(patch)
    }

    pub fn set_full(&mut self, table: &str, full: bool) -> Result<JsValue, JsValue> {
        let patch = self.editor.set_full(&TableId::new(table), full).map_err(js_err)?;
        self.emit(patch)
    }

    /// Set the caption text, or remove it with `null`.
    pub fn set_caption(&mut self, table: &str, text: Option<String>, side: JsValue) -> Result<JsValue, JsValue> {
        let side: CaptionSide = from_js(side)?;
        let patch = self
            .editor
            .set_caption(&TableId::new(table), text.as_deref().map(|t| (t, side)))
            .map_err(js_err)?;
        self.emit(patch)
    }

    pub fn recent_colors(&self) -> Result<JsValue, JsValue> {
        to_js(&self.editor.recent_colors())
    }

    // ========================================================================
    // Clipboard
    // ========================================================================

    /// `{delta, html}` for the selected cells, or `null`.
    pub fn copy(&self, cells: JsValue) -> Result<JsValue, JsValue> {
        let Some(copied) = self.editor.copy(&Self::cells(cells)?).map_err(js_err)? else {
            return Ok(JsValue::NULL);
        };
        to_js(&CopiedCells {
            delta: &copied.delta,
            html: &copied.html,
        })
    }

    pub fn paste_delta(&mut self, cells: JsValue, clipboard: JsValue) -> Result<JsValue, JsValue> {
        let clipboard: Delta = serde_wasm_bindgen::from_value(clipboard).map_err(js_err)?;
        let patch = self
            .editor
            .paste_delta(&Self::cells(cells)?, &clipboard)
            .map_err(js_err)?;
        self.emit(patch)
    }

    pub fn paste_html(&mut self, cells: JsValue, html: &str) -> Result<JsValue, JsValue> {
        let patch = self
            .editor
            .paste_html(&Self::cells(cells)?, html)
            .map_err(js_err)?;
        self.emit(patch)
    }

    // ========================================================================
    // Selection and drag
    // ========================================================================

    pub fn set_container_width(&mut self, width: f32) {
        self.editor.set_container_width(width);
    }

    pub fn layout(&self, table: &str) -> Result<JsValue, JsValue> {
        let layout = self.editor.layout(&TableId::new(table)).map_err(js_err)?;
        to_js(&layout.boxes)
    }

    pub fn select(&mut self, table: &str, x0: f32, y0: f32, x1: f32, y1: f32) -> Result<JsValue, JsValue> {
        let selection = self
            .editor
            .select(&TableId::new(table), Point::new(x0, y0), Point::new(x1, y1))
            .map_err(js_err)?;
        to_js(selection)
    }

    pub fn select_rows(&mut self, table: &str, row: usize, extend: bool) -> Result<JsValue, JsValue> {
        let selection = self
            .editor
            .select_rows(&TableId::new(table), row, extend)
            .map_err(js_err)?;
        to_js(selection)
    }

    pub fn select_cols(&mut self, table: &str, col: usize, extend: bool) -> Result<JsValue, JsValue> {
        let selection = self
            .editor
            .select_cols(&TableId::new(table), col, extend)
            .map_err(js_err)?;
        to_js(selection)
    }

    pub fn select_all(&mut self, table: &str) -> Result<JsValue, JsValue> {
        let selection = self.editor.select_all(&TableId::new(table)).map_err(js_err)?;
        to_js(selection)
    }

    pub fn selection(&self) -> Result<JsValue, JsValue> {
        to_js(&self.editor.selected_refs())
    }

    pub fn clear_selection(&mut self) {
        self.editor.clear_selection();
    }

    /// Start a drag along `"rows"` or `"cols"`. Returns `false` when the
    /// band cannot be moved.
    pub fn begin_drag(&mut self, axis: JsValue, cells: JsValue) -> Result<bool, JsValue> {
        let axis: Axis = serde_wasm_bindgen::from_value(axis).map_err(js_err)?;
        Ok(self
            .editor
            .begin_drag(axis, &Self::cells(cells)?)
            .map_err(js_err)?
            .is_ok())
    }

    pub fn drag_to(&mut self, pointer: f32) -> Result<Option<usize>, JsValue> {
        self.editor.drag_to(pointer).map_err(js_err)
    }

    pub fn end_drag(&mut self) -> Result<JsValue, JsValue> {
        let patch = self.editor.end_drag().map_err(js_err)?;
        self.emit(patch)
    }

    pub fn cancel_drag(&mut self) {
        self.editor.cancel_drag();
    }
}
