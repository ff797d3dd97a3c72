use std::collections::HashSet;

use super::{placed, repair};
use crate::error::Result;
use crate::types::{Cell, CellKey, Table};

/// Remove the rows spanned by the selection.
///
/// Cells above the range lose the rows they had inside it. Cells starting
/// inside the range but reaching below it move down to the first surviving
/// row with what is left of their rowspan. Returns `false` when nothing was
/// selected. Removing every row leaves a degenerate table.
pub fn remove_row(table: &mut Table, selected: &[CellKey]) -> Result<bool> {
    let grid = table.grid();
    let selected = placed(&grid, selected);
    let (Some(start), Some(end)) = (
        selected.iter().map(|p| p.row).min(),
        selected.iter().map(|p| p.row_end()).max(),
    ) else {
        return Ok(false);
    };
    let end = end.min(table.rows.len());

    let mut shrink: Vec<(CellKey, u32)> = Vec::new();
    let mut carry: Vec<(CellKey, u32)> = Vec::new();
    for p in grid.placements() {
        if p.row < start && p.row_end() > start {
            let overlap = p.row_end().min(end) - start;
            shrink.push((p.key.clone(), to_span(overlap)));
        } else if p.row >= start && p.row < end && p.row_end() > end {
            carry.push((p.key.clone(), to_span(p.row_end() - end)));
        }
    }

    for (key, by) in shrink {
        if let Some(cell) = table.cell_mut(&key) {
            cell.rowspan = cell.rowspan.saturating_sub(by).max(1);
        }
    }
    let moved: Vec<Cell> = carry
        .into_iter()
        .filter_map(|(key, rowspan)| {
            table.take_cell(&key).map(|mut cell| {
                cell.rowspan = rowspan;
                cell
            })
        })
        .collect();

    table.rows.drain(start..end);
    for cell in moved {
        table.insert_cell_sorted(start, cell);
    }
    repair(table);
    Ok(true)
}

/// Remove the columns spanned by the selection.
///
/// Their width goes to the column on the left (or the right when the range
/// starts at the first column), so a percent table keeps summing to 100.
/// Cells straddling the range shrink; cells starting inside it but reaching
/// past it are re-anchored on the first surviving column.
pub fn remove_col(table: &mut Table, selected: &[CellKey]) -> Result<bool> {
    let grid = table.grid();
    let selected = placed(&grid, selected);
    let (Some(start), Some(end)) = (
        selected.iter().map(|p| p.col).min(),
        selected.iter().map(|p| p.col_end()).max(),
    ) else {
        return Ok(false);
    };
    let end = end.min(table.columns.len());

    let removed_width: f32 = table
        .columns
        .get(start..end)
        .map(|cols| cols.iter().map(|c| c.width).sum())
        .unwrap_or(0.0);
    let recipient = if start > 0 {
        Some(start - 1)
    } else if end < table.columns.len() {
        Some(end)
    } else {
        None
    };
    if let Some(col) = recipient.and_then(|i| table.columns.get_mut(i)) {
        col.width += removed_width;
    }
    let anchor = table.columns.get(end).map(|c| c.id.clone());

    let mut handled: HashSet<&CellKey> = HashSet::new();
    let mut shrink: Vec<(CellKey, u32)> = Vec::new();
    let mut reanchor: Vec<(CellKey, u32)> = Vec::new();
    let mut drop: Vec<CellKey> = Vec::new();
    for p in grid.placements() {
        if !handled.insert(&p.key) {
            continue;
        }
        if p.col < start && p.col_end() > start {
            shrink.push((p.key.clone(), to_span(p.col_end().min(end) - start)));
        } else if p.col >= start && p.col < end {
            if p.col_end() > end {
                reanchor.push((p.key.clone(), to_span(p.col_end() - end)));
            } else {
                drop.push(p.key.clone());
            }
        }
    }

    for (key, by) in shrink {
        if let Some(cell) = table.cell_mut(&key) {
            cell.colspan = cell.colspan.saturating_sub(by).max(1);
        }
    }
    for (key, colspan) in reanchor {
        if let (Some(cell), Some(anchor)) = (table.cell_mut(&key), anchor.as_ref()) {
            cell.col = anchor.clone();
            cell.colspan = colspan;
        }
    }
    for key in drop {
        table.take_cell(&key);
    }
    table.columns.drain(start..end);
    repair(table);
    Ok(true)
}

fn to_span(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::types::IdGenerator;

    fn key(table: &Table, r: usize, c: usize) -> CellKey {
        CellKey {
            row: table.rows[r].id.clone(),
            col: table.columns[c].id.clone(),
        }
    }

    #[test]
    fn test_remove_middle_row_shrinks_span_from_above() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 3, 2, false, 100.0);
        table.rows[0].cells[0].rowspan = 3;
        table.rows[1].cells.remove(0);
        table.rows[2].cells.remove(0);
        let sel = key(&table, 1, 1);
        assert!(remove_row(&mut table, &[sel]).unwrap());
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0].cells[0].rowspan, 2);
        assert!(table.grid().is_rectangular());
    }

    #[test]
    fn test_remove_row_carries_span_down() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 3, 2, false, 100.0);
        let moving = table.rows[0].cells[0].col.clone();
        table.rows[0].cells[0].rowspan = 2;
        table.rows[0].cells[0].content = crate::types::CellContent::from_text("keep");
        table.rows[1].cells.remove(0);
        let sel = key(&table, 0, 1);
        assert!(remove_row(&mut table, &[sel]).unwrap());
        assert_eq!(table.row_count(), 2);
        let carried = table.rows[0].cell(&moving).unwrap();
        assert_eq!(carried.rowspan, 1);
        assert_eq!(carried.content.text(), "keep");
        assert!(table.grid().is_rectangular());
    }

    #[test]
    fn test_remove_col_donates_width_left() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 2, 4, true, 100.0);
        let sel = key(&table, 0, 2);
        assert!(remove_col(&mut table, &[sel]).unwrap());
        assert_eq!(table.col_count(), 3);
        assert!((table.columns[1].width - 50.0).abs() < 0.01);
        assert!((table.total_width() - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_remove_col_reanchors_spanning_cell() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 2, 3, false, 100.0);
        table.rows[0].cells[0].colspan = 2;
        table.rows[0].cells.remove(1);
        let sel = key(&table, 1, 0);
        assert!(remove_col(&mut table, &[sel]).unwrap());
        assert_eq!(table.col_count(), 2);
        assert_eq!(table.rows[0].cells[0].col, table.columns[0].id);
        assert_eq!(table.rows[0].cells[0].colspan, 1);
        assert!(table.grid().is_rectangular());
    }

    #[test]
    fn test_remove_every_row_degenerates() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 2, 2, false, 100.0);
        let sel = vec![key(&table, 0, 0), key(&table, 1, 0)];
        assert!(remove_row(&mut table, &sel).unwrap());
        assert!(table.is_degenerate());
    }
}
