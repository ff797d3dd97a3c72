//! Restores the grid invariants after an edit or an external change.
//!
//! Each step fixes one kind of damage and may expose another (removing a
//! column can empty a row), so the steps run in a loop until a full pass
//! changes nothing. A pass over a healthy table is a no-op, which makes
//! the whole thing idempotent.

use std::collections::{HashMap, HashSet};

use crate::types::{count_f32, Cell, CellKey, CellPos, Table};

const MAX_PASSES: usize = 16;

/// Repair the table in place. Returns `true` when anything changed.
///
/// A table left without rows or columns is degenerate; the caller removes
/// it from the document.
pub fn repair(table: &mut Table) -> bool {
    run(table, false)
}

/// Like [`repair`], but an empty row whose every slot is covered by a
/// rowspan from above stays. In a copied block such a row marks the rows
/// the rowspan still covers.
pub fn repair_fragment(table: &mut Table) -> bool {
    run(table, true)
}

fn run(table: &mut Table, keep_covered_rows: bool) -> bool {
    let mut changed = false;
    for _ in 0..MAX_PASSES {
        if !repair_pass(table, keep_covered_rows) {
            return changed;
        }
        changed = true;
    }
    log::warn!("table {} still changing after {MAX_PASSES} repair passes", table.id);
    changed
}

fn repair_pass(table: &mut Table, keep_covered_rows: bool) -> bool {
    let mut changed = drop_orphans(table);
    changed |= clip_spans(table);
    changed |= drop_empty_rows(table, keep_covered_rows);
    changed |= drop_unreferenced_columns(table);
    changed |= resolve_overlaps(table);
    changed |= fill_gaps(table);
    changed |= sort_cells(table);
    changed |= normalize_widths(table);
    changed |= ensure_lines(table);
    changed
}

/// Cells whose column is unknown, or that repeat a column within a row.
fn drop_orphans(table: &mut Table) -> bool {
    let known: HashSet<_> = table.columns.iter().map(|c| c.id.clone()).collect();
    let mut changed = false;
    for row in &mut table.rows {
        let before = row.cells.len();
        let mut seen = HashSet::new();
        row.cells
            .retain(|cell| known.contains(&cell.col) && seen.insert(cell.col.clone()));
        if row.cells.len() != before {
            log::debug!("dropped {} orphan cells from row {}", before - row.cells.len(), row.id);
            changed = true;
        }
        for cell in &mut row.cells {
            if cell.rowspan == 0 || cell.colspan == 0 {
                cell.rowspan = cell.rowspan.max(1);
                cell.colspan = cell.colspan.max(1);
                changed = true;
            }
        }
    }
    changed
}

/// Spans running past the last row or column are cut at the edge.
fn clip_spans(table: &mut Table) -> bool {
    let rows = table.rows.len();
    let cols = table.columns.len();
    let col_index: HashMap<_, _> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.clone(), i))
        .collect();
    let mut changed = false;
    for (r, row) in table.rows.iter_mut().enumerate().rev() {
        let max_rowspan = u32::try_from(rows - r).unwrap_or(u32::MAX);
        for cell in &mut row.cells {
            if cell.rowspan > max_rowspan {
                cell.rowspan = max_rowspan;
                changed = true;
            }
            if let Some(&c) = col_index.get(&cell.col) {
                let max_colspan = u32::try_from(cols - c).unwrap_or(u32::MAX);
                if cell.colspan > max_colspan {
                    cell.colspan = max_colspan;
                    changed = true;
                }
            }
        }
    }
    changed
}

/// Rows owning no cells are removed. Every rowspan that crossed one
/// shrinks by the number of removed rows it covered.
fn drop_empty_rows(table: &mut Table, keep_covered: bool) -> bool {
    let mut empty: Vec<usize> = table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.cells.is_empty())
        .map(|(r, _)| r)
        .collect();
    if keep_covered && !empty.is_empty() && !table.columns.is_empty() {
        let grid = table.grid();
        let cols = table.columns.len();
        empty.retain(|&r| grid.row_coverage(r) < cols);
    }
    if empty.is_empty() {
        return false;
    }
    for (r, row) in table.rows.iter_mut().enumerate() {
        for cell in &mut row.cells {
            let end = r + crate::grid::span(cell.rowspan);
            let crossed = empty.iter().filter(|&&e| e > r && e < end).count();
            if crossed > 0 {
                let crossed = u32::try_from(crossed).unwrap_or(u32::MAX);
                cell.rowspan = cell.rowspan.saturating_sub(crossed).max(1);
            }
        }
    }
    for &r in empty.iter().rev() {
        let removed = table.rows.remove(r);
        log::debug!("removed empty row {} from table {}", removed.id, table.id);
    }
    true
}

/// Columns no cell starts in are removed in one sweep. Each one's width
/// goes to the nearest surviving column on its left (else the first
/// survivor) and colspans across them shrink.
fn drop_unreferenced_columns(table: &mut Table) -> bool {
    let referenced: HashSet<_> = table
        .rows
        .iter()
        .flat_map(|row| row.cells.iter().map(|c| c.col.clone()))
        .collect();
    let dropped: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(_, col)| !referenced.contains(&col.id))
        .map(|(c, _)| c)
        .collect();
    if dropped.is_empty() {
        return false;
    }

    let col_index: HashMap<_, _> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.clone(), i))
        .collect();
    for cell in table.rows.iter_mut().flat_map(|row| row.cells.iter_mut()) {
        let Some(&c) = col_index.get(&cell.col) else {
            continue;
        };
        let end = c + crate::grid::span(cell.colspan);
        let crossed = dropped.iter().filter(|&&d| d > c && d < end).count();
        if crossed > 0 {
            let crossed = u32::try_from(crossed).unwrap_or(u32::MAX);
            cell.colspan = cell.colspan.saturating_sub(crossed).max(1);
        }
    }

    let mut carried = 0.0;
    let mut kept = Vec::with_capacity(table.columns.len() - dropped.len());
    for col in std::mem::take(&mut table.columns) {
        if referenced.contains(&col.id) {
            kept.push(col);
        } else if let Some(left) = kept.last_mut() {
            left.width += col.width;
        } else {
            carried += col.width;
        }
    }
    if let Some(first) = kept.first_mut() {
        first.width += carried;
    }
    log::debug!("removed {} unreferenced columns from table {}", dropped.len(), table.id);
    table.columns = kept;
    true
}

enum Fix {
    Trim { pos: CellPos, rowspan: u32, colspan: u32 },
    Fold { pos: CellPos, into: CellKey },
}

/// Cells claiming slots already owned by an earlier cell. A cell whose
/// starting slot is taken is folded into the owner; otherwise its spans
/// are trimmed to the free area.
fn resolve_overlaps(table: &mut Table) -> bool {
    let rows = table.rows.len();
    let cols = table.columns.len();
    if rows == 0 || cols == 0 {
        return false;
    }
    let col_index: HashMap<_, _> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.clone(), i))
        .collect();
    let mut owner: Vec<Option<CellKey>> = vec![None; rows * cols];
    let mut fixes = Vec::new();

    for (r, row) in table.rows.iter().enumerate() {
        for (index, cell) in row.cells.iter().enumerate() {
            let Some(&c) = col_index.get(&cell.col) else {
                continue;
            };
            let pos = CellPos { row: r, index };
            if let Some(Some(into)) = owner.get(r * cols + c) {
                fixes.push(Fix::Fold {
                    pos,
                    into: into.clone(),
                });
                continue;
            }
            let free = |rr: usize, cc: usize| matches!(owner.get(rr * cols + cc), Some(None));
            let mut colspan = 1usize;
            while colspan < crate::grid::span(cell.colspan) && c + colspan < cols && free(r, c + colspan)
            {
                colspan += 1;
            }
            let mut rowspan = 1usize;
            while rowspan < crate::grid::span(cell.rowspan)
                && r + rowspan < rows
                && (c..c + colspan).all(|cc| free(r + rowspan, cc))
            {
                rowspan += 1;
            }
            let key = CellKey {
                row: row.id.clone(),
                col: cell.col.clone(),
            };
            for rr in r..r + rowspan {
                for cc in c..c + colspan {
                    if let Some(slot) = owner.get_mut(rr * cols + cc) {
                        *slot = Some(key.clone());
                    }
                }
            }
            let (rowspan, colspan) = (
                u32::try_from(rowspan).unwrap_or(1),
                u32::try_from(colspan).unwrap_or(1),
            );
            if rowspan != cell.rowspan || colspan != cell.colspan {
                fixes.push(Fix::Trim {
                    pos,
                    rowspan,
                    colspan,
                });
            }
        }
    }
    if fixes.is_empty() {
        return false;
    }

    let mut folded: Vec<(CellPos, CellKey)> = Vec::new();
    for fix in fixes {
        match fix {
            Fix::Trim {
                pos,
                rowspan,
                colspan,
            } => {
                if let Some(cell) = table
                    .rows
                    .get_mut(pos.row)
                    .and_then(|row| row.cells.get_mut(pos.index))
                {
                    log::debug!("trimmed overlapping cell {}/{}", pos.row, cell.col);
                    cell.rowspan = rowspan;
                    cell.colspan = colspan;
                }
            }
            Fix::Fold { pos, into } => folded.push((pos, into)),
        }
    }
    // Remove back to front so earlier positions stay valid.
    folded.sort_by(|a, b| (b.0.row, b.0.index).cmp(&(a.0.row, a.0.index)));
    let mut contents = Vec::new();
    for (pos, into) in folded {
        let Some(row) = table.rows.get_mut(pos.row) else {
            continue;
        };
        if pos.index < row.cells.len() {
            let cell = row.cells.remove(pos.index);
            log::debug!("folded overlapping cell {}/{} into {}/{}", row.id, cell.col, into.row, into.col);
            contents.push((into, cell.content));
        }
    }
    for (into, content) in contents.into_iter().rev() {
        if let Some(cell) = table.cell_mut(&into) {
            cell.content.append(content);
        }
    }
    true
}

/// Slots no cell covers get a fresh 1x1 cell.
fn fill_gaps(table: &mut Table) -> bool {
    let grid = table.grid();
    let mut gaps = Vec::new();
    for r in 0..grid.rows() {
        for c in 0..grid.cols() {
            if grid.owner(r, c).is_none() {
                if let Some(col) = table.columns.get(c) {
                    gaps.push((r, col.id.clone()));
                }
            }
        }
    }
    let changed = !gaps.is_empty();
    for (r, col) in gaps {
        log::debug!("synthesized cell {col} in row {r} of table {}", table.id);
        table.insert_cell_sorted(r, Cell::new(col));
    }
    changed
}

fn sort_cells(table: &mut Table) -> bool {
    let col_index: HashMap<_, _> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.clone(), i))
        .collect();
    let mut changed = false;
    for row in &mut table.rows {
        let sorted = row
            .cells
            .windows(2)
            .all(|w| match w {
                [a, b] => col_index.get(&a.col) <= col_index.get(&b.col),
                _ => true,
            });
        if !sorted {
            row.cells
                .sort_by_key(|cell| col_index.get(&cell.col).copied().unwrap_or(usize::MAX));
            changed = true;
        }
    }
    changed
}

/// Percent widths must add up to 100.
fn normalize_widths(table: &mut Table) -> bool {
    if !table.full || table.columns.is_empty() {
        return false;
    }
    let total = table.total_width();
    if (total - 100.0).abs() <= 0.01 {
        return false;
    }
    if total > 0.0 {
        for col in &mut table.columns {
            col.width = col.width * 100.0 / total;
        }
    } else {
        let even = 100.0 / count_f32(table.columns.len());
        for col in &mut table.columns {
            col.width = even;
        }
    }
    true
}

fn ensure_lines(table: &mut Table) -> bool {
    let mut changed = false;
    for row in &mut table.rows {
        for cell in &mut row.cells {
            changed |= cell.content.ensure_line();
        }
    }
    changed
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp
)]
mod tests {
    use super::*;
    use crate::types::{CellContent, ColId, IdGenerator, Row};

    #[test]
    fn test_healthy_table_is_untouched() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 3, 3, true, 100.0);
        let before = table.clone();
        assert!(!repair(&mut table));
        assert_eq!(table, before);
    }

    #[test]
    fn test_fills_missing_cells() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 2, 3, false, 100.0);
        table.rows[1].cells.remove(1);
        assert!(repair(&mut table));
        assert_eq!(table.rows[1].cells.len(), 3);
        assert!(table.grid().is_rectangular());
    }

    #[test]
    fn test_clips_rowspan_past_last_row() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 2, 2, false, 100.0);
        table.rows[1].cells[0].rowspan = 4;
        assert!(repair(&mut table));
        assert_eq!(table.rows[1].cells[0].rowspan, 1);
    }

    #[test]
    fn test_removes_partly_covered_empty_row() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 3, 2, false, 100.0);
        table.rows[0].cells[0].rowspan = 2;
        table.rows[1].cells.clear();
        assert!(repair(&mut table));
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0].cells[0].rowspan, 1);
        assert!(table.grid().is_rectangular());
    }

    #[test]
    fn test_covered_empty_row_collapses_rowspans() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 4, 2, false, 100.0);
        table.rows[0].cells[0].rowspan = 3;
        table.rows[0].cells[1].rowspan = 2;
        let right = table.columns[1].id.clone();
        table.rows[1].cells.clear();
        table.rows[2].cells.retain(|c| c.col == right);
        assert!(repair(&mut table));
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.rows[0].cells[0].rowspan, 2);
        assert_eq!(table.rows[0].cells[1].rowspan, 1);
        assert_eq!(table.rows[1].cells.len(), 1);
        assert!(table.grid().is_rectangular());
        assert!(!repair(&mut table));
    }

    #[test]
    fn test_drops_several_columns_in_one_pass() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 2, 5, false, 100.0);
        table.columns[0].width = 40.0;
        table.rows[0].cells[0].colspan = 3;
        table.rows[0].cells.drain(1..3);
        table.rows[1].cells.drain(1..3);
        table.rows[1].cells[0].colspan = 3;
        assert!(repair(&mut table));
        assert_eq!(table.col_count(), 3);
        assert_eq!(table.columns[0].width, 240.0);
        assert_eq!(table.rows[0].cells[0].colspan, 1);
        assert_eq!(table.rows[1].cells[0].colspan, 1);
        assert!(table.grid().is_rectangular());
    }

    #[test]
    fn test_removes_unreferenced_column_and_keeps_width() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 1, 3, true, 100.0);
        table.rows[0].cells[0].colspan = 2;
        table.rows[0].cells.remove(1);
        assert!(repair(&mut table));
        assert_eq!(table.col_count(), 2);
        assert_eq!(table.rows[0].cells[0].colspan, 1);
        assert!((table.total_width() - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_overlap_folds_content_into_owner() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 2, 2, false, 100.0);
        table.rows[0].cells[0].rowspan = 2;
        table.rows[0].cells[0].content = CellContent::from_text("top");
        table.rows[1].cells[0].content = CellContent::from_text("under");
        assert!(repair(&mut table));
        assert_eq!(table.rows[1].cells.len(), 1);
        assert_eq!(table.rows[0].cells[0].content.text(), "top\nunder");
        assert!(table.grid().is_rectangular());
    }

    #[test]
    fn test_orphans_and_degenerate() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 1, 1, false, 100.0);
        table.rows[0].cells[0].col = ColId::new("gone");
        table.rows.push(Row::new(ids.row()));
        repair(&mut table);
        assert!(table.is_degenerate());
    }

    #[test]
    fn test_repair_is_idempotent() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 4, 4, false, 100.0);
        table.rows[0].cells[1].colspan = 3;
        table.rows[2].cells[0].rowspan = 5;
        table.rows[3].cells.clear();
        repair(&mut table);
        let once = table.clone();
        assert!(!repair(&mut table));
        assert_eq!(table, once);
        assert!(table.grid().is_rectangular());
    }
}
