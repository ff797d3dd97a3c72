use serde::{Deserialize, Serialize};

use super::content::{CellContent, Line};
use super::ids::{CellKey, ColId, IdGenerator, RowId, TableId};
use crate::error::{Result, TableError};
use crate::grid::GridMap;

/// Horizontal placement of the whole table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    pub fn is_left(&self) -> bool {
        *self == Self::Left
    }
}

/// Row group a row is rendered in (`thead`, `tbody`, `tfoot`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowGroup {
    Head,
    #[default]
    Body,
    Foot,
}

impl RowGroup {
    pub fn is_body(&self) -> bool {
        *self == Self::Body
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Head => "thead",
            Self::Body => "tbody",
            Self::Foot => "tfoot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionSide {
    #[default]
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub side: CaptionSide,
    pub line: Line,
}

/// Cell decoration, kept apart from the block formatting of its content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
}

impl CellStyle {
    pub fn is_empty(&self) -> bool {
        self.background_color.is_none() && self.border_color.is_none() && self.css.is_none()
    }

    /// Overlay the fields set in `other`. An empty string clears a field.
    pub fn merge(&mut self, other: &CellStyle) {
        fn overlay(target: &mut Option<String>, value: &Option<String>) {
            match value.as_deref() {
                Some("") => *target = None,
                Some(v) => *target = Some(v.to_string()),
                None => {}
            }
        }
        overlay(&mut self.background_color, &other.background_color);
        overlay(&mut self.border_color, &other.border_color);
        overlay(&mut self.css, &other.css);
    }

    /// Inline CSS declaration string for HTML output.
    pub fn to_css(&self) -> String {
        let mut parts = Vec::new();
        if let Some(bg) = &self.background_color {
            parts.push(format!("background-color: {bg}"));
        }
        if let Some(border) = &self.border_color {
            parts.push(format!("border-color: {border}"));
        }
        if let Some(css) = &self.css {
            let css = css.trim().trim_end_matches(';');
            if !css.is_empty() {
                parts.push(css.to_string());
            }
        }
        parts.join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColId,
    /// Percent of the table when the table is `full`, else pixels.
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub col: ColId,
    pub rowspan: u32,
    pub colspan: u32,
    #[serde(default)]
    pub style: CellStyle,
    pub content: CellContent,
}

impl Cell {
    pub fn new(col: ColId) -> Self {
        Self {
            col,
            rowspan: 1,
            colspan: 1,
            style: CellStyle::default(),
            content: CellContent::empty(),
        }
    }

    pub fn with_content(col: ColId, content: CellContent) -> Self {
        Self {
            content,
            ..Self::new(col)
        }
    }

    pub fn is_spanning(&self) -> bool {
        self.rowspan > 1 || self.colspan > 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    /// Explicit height override in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default)]
    pub group: RowGroup,
    /// Cells starting in this row, in column order.
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(id: RowId) -> Self {
        Self {
            id,
            height: None,
            group: RowGroup::Body,
            cells: Vec::new(),
        }
    }

    pub fn cell(&self, col: &ColId) -> Option<&Cell> {
        self.cells.iter().find(|c| c.col == *col)
    }
}

/// A grid table: one column group, rows with their cells, optional caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    /// Percentage sizing (widths sum to 100) instead of fixed pixels.
    pub full: bool,
    #[serde(default)]
    pub align: Align,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<Caption>,
}

/// Where a cell lives in the tree: row index and index within that row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPos {
    pub row: usize,
    pub index: usize,
}

impl Table {
    /// An empty table shell with no rows or columns.
    pub fn new(id: TableId, full: bool) -> Self {
        Self {
            id,
            full,
            align: Align::Left,
            columns: Vec::new(),
            rows: Vec::new(),
            caption: None,
        }
    }

    /// A balanced `rows` x `cols` grid of empty 1x1 cells with fresh ids.
    pub fn balanced(
        ids: &mut IdGenerator,
        rows: usize,
        cols: usize,
        full: bool,
        col_width_px: f32,
    ) -> Self {
        let mut table = Self::new(ids.table(), full);
        let width = if full {
            100.0 / count_f32(cols.max(1))
        } else {
            col_width_px
        };
        table.columns = (0..cols)
            .map(|_| Column {
                id: ids.col(),
                width,
            })
            .collect();
        for _ in 0..rows {
            let mut row = Row::new(ids.row());
            row.cells = table
                .columns
                .iter()
                .map(|c| Cell::new(c.id.clone()))
                .collect();
            table.rows.push(row);
        }
        table
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.columns.len()
    }

    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).sum()
    }

    /// A table with no rows or no columns must be removed from the document.
    pub fn is_degenerate(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty() || self.cell_count() == 0
    }

    pub fn col_index(&self, col: &ColId) -> Option<usize> {
        self.columns.iter().position(|c| c.id == *col)
    }

    pub fn row_index(&self, row: &RowId) -> Option<usize> {
        self.rows.iter().position(|r| r.id == *row)
    }

    /// Sum of column widths (percent or pixels).
    pub fn total_width(&self) -> f32 {
        self.columns.iter().map(|c| c.width).sum()
    }

    /// Find a cell's owning row and index, failing when its row or column
    /// does not exist in this table.
    pub fn locate(&self, key: &CellKey) -> Result<CellPos> {
        let row = self.row_index(&key.row).ok_or_else(|| {
            TableError::MissingAncestor(format!("row {} not in table {}", key.row, self.id))
        })?;
        if self.col_index(&key.col).is_none() {
            return Err(TableError::MissingAncestor(format!(
                "column {} not in table {}",
                key.col, self.id
            )));
        }
        let index = self
            .rows
            .get(row)
            .and_then(|r| r.cells.iter().position(|c| c.col == key.col))
            .ok_or_else(|| {
                TableError::MissingAncestor(format!(
                    "no cell at {}/{} in table {}",
                    key.row, key.col, self.id
                ))
            })?;
        Ok(CellPos { row, index })
    }

    pub fn cell(&self, key: &CellKey) -> Option<&Cell> {
        self.rows
            .iter()
            .find(|r| r.id == key.row)
            .and_then(|r| r.cell(&key.col))
    }

    pub fn cell_mut(&mut self, key: &CellKey) -> Option<&mut Cell> {
        self.rows
            .iter_mut()
            .find(|r| r.id == key.row)
            .and_then(|r| r.cells.iter_mut().find(|c| c.col == key.col))
    }

    /// Remove a cell from the tree and return it.
    pub fn take_cell(&mut self, key: &CellKey) -> Option<Cell> {
        let pos = self.locate(key).ok()?;
        let row = self.rows.get_mut(pos.row)?;
        if pos.index < row.cells.len() {
            Some(row.cells.remove(pos.index))
        } else {
            None
        }
    }

    /// Insert a cell into row `row`, keeping cells in column order.
    pub fn insert_cell_sorted(&mut self, row: usize, cell: Cell) {
        let Some(target) = self.col_index(&cell.col) else {
            return;
        };
        let order: Vec<Option<usize>> = self
            .rows
            .get(row)
            .map(|r| r.cells.iter().map(|c| self.col_index(&c.col)).collect())
            .unwrap_or_default();
        let Some(r) = self.rows.get_mut(row) else {
            return;
        };
        let at = order
            .iter()
            .position(|idx| idx.is_some_and(|i| i > target))
            .unwrap_or(r.cells.len());
        r.cells.insert(at, cell);
    }

    /// Every cell key in document order.
    pub fn cell_keys(&self) -> Vec<CellKey> {
        self.rows
            .iter()
            .flat_map(|row| {
                row.cells.iter().map(move |c| CellKey {
                    row: row.id.clone(),
                    col: c.col.clone(),
                })
            })
            .collect()
    }

    /// Occupancy map of the current tree.
    pub fn grid(&self) -> GridMap {
        GridMap::build(self)
    }
}

/// Lossless enough for table dimensions (always < 2^24).
#[allow(clippy::cast_precision_loss)]
pub(crate) fn count_f32(n: usize) -> f32 {
    n as f32
}
