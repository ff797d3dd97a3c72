use super::{placed, repair};
use crate::error::Result;
use crate::grid::accumulate_extent;
use crate::types::{Cell, CellKey, Table};

/// Merge the selected cells into the first of them (in document order).
///
/// The selection must hold at least two cells tiling a closed rectangle;
/// anything else is a no-op. The merged cell's spans come from the
/// accumulated extent of the group, and the other cells' content is
/// appended in document order.
pub fn merge_cells(table: &mut Table, selected: &[CellKey]) -> Result<Option<CellKey>> {
    let mut keys: Vec<CellKey> = selected.to_vec();
    keys.sort();
    keys.dedup();
    if keys.len() < 2 {
        return Ok(None);
    }
    for key in &keys {
        table.locate(key)?;
    }

    let grid = table.grid();
    let Some(rect) = grid.bounds(&keys) else {
        return Ok(None);
    };
    if !grid.is_closed(&rect, &keys) {
        log::debug!(
            "merge in table {} skipped: selection is not a closed rectangle",
            table.id
        );
        return Ok(None);
    }
    let group = placed(&grid, &keys);
    let extent = accumulate_extent(group.iter().copied());
    let Some((first, rest)) = group.split_first() else {
        return Ok(None);
    };
    let first = first.key.clone();
    let rest: Vec<CellKey> = rest.iter().map(|p| p.key.clone()).collect();

    let mut absorbed = Vec::with_capacity(rest.len());
    for key in &rest {
        if let Some(cell) = table.take_cell(key) {
            absorbed.push(cell.content);
        }
    }
    if let Some(cell) = table.cell_mut(&first) {
        for content in absorbed {
            cell.content.append(content);
        }
        cell.rowspan = u32::try_from(extent.rows).unwrap_or(u32::MAX);
        cell.colspan = u32::try_from(extent.cols).unwrap_or(u32::MAX);
    }
    repair(table);
    Ok(Some(first))
}

/// Split a spanning cell back into 1x1 cells. The original keeps its content
/// and its starting slot.
pub fn split_cell(table: &mut Table, key: &CellKey) -> Result<bool> {
    table.locate(key)?;
    let grid = table.grid();
    let Some(p) = grid.placement(key).cloned() else {
        return Ok(false);
    };
    if p.rowspan == 1 && p.colspan == 1 {
        return Ok(false);
    }
    if let Some(cell) = table.cell_mut(key) {
        cell.rowspan = 1;
        cell.colspan = 1;
    }
    for r in p.row..p.row_end() {
        for c in p.col..p.col_end() {
            if r == p.row && c == p.col {
                continue;
            }
            let Some(col) = table.columns.get(c).map(|c| c.id.clone()) else {
                continue;
            };
            table.insert_cell_sorted(r, Cell::new(col));
        }
    }
    repair(table);
    Ok(true)
}
