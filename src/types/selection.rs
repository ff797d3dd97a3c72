use serde::{Deserialize, Serialize};

use super::ids::{CellKey, CellRef, TableId};

/// How a selection was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionType {
    /// Free-form pointer drag (default)
    #[default]
    CellRange,
    /// Row header click / shift-click
    RowRange,
    /// Column header click / shift-click
    ColumnRange,
    /// Corner click
    All,
}

/// A resolved cell selection within one table.
///
/// `anchor` is the row or column index a header shift-click extends from;
/// cells are always in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub selection_type: SelectionType,
    pub table: TableId,
    pub cells: Vec<CellKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<usize>,
}

impl Selection {
    pub fn new(selection_type: SelectionType, table: TableId, cells: Vec<CellKey>) -> Self {
        Self {
            selection_type,
            table,
            cells,
            anchor: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells as document-wide references.
    pub fn refs(&self) -> Vec<CellRef> {
        self.cells
            .iter()
            .map(|key| CellRef::new(self.table.clone(), key.clone()))
            .collect()
    }
}
