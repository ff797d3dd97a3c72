use std::collections::HashSet;

use super::{placed, repair};
use crate::config::TableConfig;
use crate::error::{Result, TableError};
use crate::types::{count_f32, Cell, CellKey, ColId, Column, IdGenerator, Row, RowId, Table};

/// A balanced grid of empty cells, size-checked against the limits.
pub fn new_table(
    ids: &mut IdGenerator,
    rows: usize,
    cols: usize,
    full: bool,
    config: &TableConfig,
) -> Result<Table> {
    if rows == 0 || cols == 0 || rows >= config.max_rows || cols >= config.max_cols {
        return Err(TableError::InvalidSize {
            rows,
            cols,
            max_rows: config.max_rows,
            max_cols: config.max_cols,
        });
    }
    Ok(Table::balanced(
        ids,
        rows,
        cols,
        full,
        config.default_col_width_px,
    ))
}

/// Insert one row above the topmost pivot or below the bottommost one.
///
/// Slots under a cell whose rowspan crosses the new boundary get no cell of
/// their own; that cell grows by one row instead.
pub fn append_row(
    table: &mut Table,
    ids: &mut IdGenerator,
    pivots: &[CellKey],
    after: bool,
) -> Result<Option<RowId>> {
    let grid = table.grid();
    let pivots = placed(&grid, pivots);
    let index = if after {
        pivots.iter().map(|p| p.row_end()).max()
    } else {
        pivots.iter().map(|p| p.row).min()
    };
    let Some(index) = index else {
        return Ok(None);
    };

    let mut grown: HashSet<CellKey> = HashSet::new();
    let mut row = Row::new(ids.row());
    let neighbour = if after { index.checked_sub(1) } else { Some(index) };
    if let Some(n) = neighbour.and_then(|i| table.rows.get(i)) {
        row.group = n.group;
    }
    for (c, column) in table.columns.iter().enumerate() {
        let straddling = grid
            .placements()
            .iter()
            .find(|p| p.row < index && p.row_end() > index && p.col <= c && p.col_end() > c);
        match straddling {
            Some(p) => {
                grown.insert(p.key.clone());
            }
            None => row.cells.push(Cell::new(column.id.clone())),
        }
    }
    for key in &grown {
        if let Some(cell) = table.cell_mut(key) {
            cell.rowspan += 1;
        }
    }
    let id = row.id.clone();
    table.rows.insert(index.min(table.rows.len()), row);
    repair(table);
    Ok(Some(id))
}

/// Insert one column left of the leftmost pivot or right of the rightmost.
///
/// A cell whose colspan crosses the new boundary absorbs the column (once,
/// however many rows it spans); every other row gets a fresh cell.
pub fn append_col(
    table: &mut Table,
    ids: &mut IdGenerator,
    pivots: &[CellKey],
    after: bool,
    config: &TableConfig,
) -> Result<Option<ColId>> {
    let grid = table.grid();
    let pivots = placed(&grid, pivots);
    let index = if after {
        pivots.iter().map(|p| p.col_end()).max()
    } else {
        pivots.iter().map(|p| p.col).min()
    };
    let Some(index) = index else {
        return Ok(None);
    };

    let width = if table.full {
        table.total_width() / count_f32(table.columns.len().max(1))
    } else {
        config.default_col_width_px
    };
    let column = Column {
        id: ids.col(),
        width,
    };
    let id = column.id.clone();

    let mut grown: HashSet<CellKey> = HashSet::new();
    let mut fresh: Vec<usize> = Vec::new();
    for r in 0..table.rows.len() {
        let straddling = grid
            .placements()
            .iter()
            .find(|p| p.col < index && p.col_end() > index && p.row <= r && p.row_end() > r);
        match straddling {
            Some(p) => {
                grown.insert(p.key.clone());
            }
            None => fresh.push(r),
        }
    }
    for key in &grown {
        if let Some(cell) = table.cell_mut(key) {
            cell.colspan += 1;
        }
    }
    table.columns.insert(index.min(table.columns.len()), column);
    for r in fresh {
        table.insert_cell_sorted(r, Cell::new(id.clone()));
    }
    repair(table);
    Ok(Some(id))
}
