//! Structural attributes as they appear on document runs.
//!
//! These are the only form in which table structure exists in the host
//! document. The tree keeps one record per cell; the duplicated per-line
//! form is produced by `sync::serialize`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ids::{ColId, RowId, TableId};
use super::table::{Align, CaptionSide, CellStyle, RowGroup};
use crate::delta::Attributes;
use crate::error::{Result, TableError};

/// Line attribute key carrying `CellAttrs`.
pub const CELL_KEY: &str = "table-cell";
/// Block embed key carrying `ColAttrs`.
pub const COL_KEY: &str = "table-col";
/// Line attribute key carrying `CaptionAttrs`.
pub const CAPTION_KEY: &str = "table-caption";

fn one() -> u32 {
    1
}

/// Per-line structural attribute of a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellAttrs {
    pub table_id: TableId,
    pub row_id: RowId,
    pub col_id: ColId,
    #[serde(default = "one")]
    pub rowspan: u32,
    #[serde(default = "one")]
    pub colspan: u32,
    #[serde(default, skip_serializing_if = "CellStyle::is_empty")]
    pub style: CellStyle,
    /// Rows following this cell's row that own no cells of their own.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub empty_row: Vec<RowId>,
    #[serde(default, skip_serializing_if = "RowGroup::is_body")]
    pub row_group: RowGroup,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_height: Option<f32>,
}

/// Column descriptor embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColAttrs {
    pub table_id: TableId,
    pub col_id: ColId,
    pub width: f32,
    #[serde(default)]
    pub full: bool,
    #[serde(default, skip_serializing_if = "Align::is_left")]
    pub align: Align,
}

/// Caption line attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionAttrs {
    pub table_id: TableId,
    pub side: CaptionSide,
}

/// Structural meaning of one attribute map, if any.
#[derive(Debug, Clone, PartialEq)]
pub enum Structural {
    Cell(CellAttrs),
    Col(ColAttrs),
    Caption(CaptionAttrs),
}

impl Structural {
    pub fn table_id(&self) -> &TableId {
        match self {
            Self::Cell(a) => &a.table_id,
            Self::Col(a) => &a.table_id,
            Self::Caption(a) => &a.table_id,
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(key: &str, value: &Value) -> Result<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| TableError::Attribute(format!("{key}: {e}")))
}

/// Read the cell or caption attribute of a line's newline attributes.
///
/// A value that does not decode is salvaged down to its ids so repair can
/// heal the rest. Without readable ids the line is plain text.
pub fn line_structure(attributes: &Attributes) -> Option<Structural> {
    if let Some(value) = attributes.get(CELL_KEY) {
        return decode(CELL_KEY, value)
            .map_or_else(|e| salvage(&e, || salvage_cell(value)), Some)
            .map(Structural::Cell);
    }
    if let Some(value) = attributes.get(CAPTION_KEY) {
        return decode(CAPTION_KEY, value)
            .map_or_else(|e| salvage(&e, || salvage_caption(value)), Some)
            .map(Structural::Caption);
    }
    None
}

/// Read a column descriptor embed.
pub fn embed_structure(embed: &Attributes) -> Option<Structural> {
    let value = embed.get(COL_KEY)?;
    decode(COL_KEY, value)
        .map_or_else(|e| salvage(&e, || salvage_col(value)), Some)
        .map(Structural::Col)
}

fn salvage<T>(error: &TableError, read: impl FnOnce() -> Option<T>) -> Option<T> {
    let salvaged = read();
    if salvaged.is_some() {
        log::debug!("{error}; keeping the ids for repair");
    } else {
        log::debug!("{error}; reading the line as plain text");
    }
    salvaged
}

/// An id written as a string or a bare number.
fn id_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A span written as a number or a numeric string; anything else is 1.
fn span_field(value: &Value, key: &str) -> u32 {
    match value.get(key) {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .unwrap_or(1)
}

fn field<T: serde::de::DeserializeOwned>(value: &Value, key: &str) -> Option<T> {
    value
        .get(key)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

fn salvage_cell(value: &Value) -> Option<CellAttrs> {
    Some(CellAttrs {
        table_id: TableId::new(id_field(value, "tableId")?),
        row_id: RowId::new(id_field(value, "rowId")?),
        col_id: ColId::new(id_field(value, "colId")?),
        rowspan: span_field(value, "rowspan"),
        colspan: span_field(value, "colspan"),
        style: field(value, "style").unwrap_or_default(),
        empty_row: field(value, "emptyRow").unwrap_or_default(),
        row_group: field(value, "rowGroup").unwrap_or_default(),
        row_height: field(value, "rowHeight"),
    })
}

fn salvage_col(value: &Value) -> Option<ColAttrs> {
    let width = match value.get("width") {
        Some(Value::String(s)) => s.trim().trim_end_matches("px").parse().ok(),
        _ => field(value, "width"),
    };
    Some(ColAttrs {
        table_id: TableId::new(id_field(value, "tableId")?),
        col_id: ColId::new(id_field(value, "colId")?),
        width: width.unwrap_or(crate::sync::FALLBACK_COL_WIDTH),
        full: field(value, "full").unwrap_or_default(),
        align: field(value, "align").unwrap_or_default(),
    })
}

fn salvage_caption(value: &Value) -> Option<CaptionAttrs> {
    Some(CaptionAttrs {
        table_id: TableId::new(id_field(value, "tableId")?),
        side: field(value, "side").unwrap_or_default(),
    })
}

/// Wrap a structural record under its attribute key.
pub fn encode<T: Serialize>(key: &str, value: &T) -> Result<Attributes> {
    let mut map = Attributes::new();
    map.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(map)
}
