//! Structural Paste Merger.
//!
//! A copied block of cells arrives as a `TableFragment`. When the
//! destination is a closed block whose extent matches the fragment's,
//! cells are replaced one for one, spans included. Otherwise the fragment
//! is tiled over the destination by content only.

use std::collections::HashSet;

use crate::delta::Delta;
use crate::error::Result;
use crate::grid::{accumulate_extent, flow_layout, Extent, GridRect, Placement};
use crate::structure::{repair, repair_fragment};
use crate::sync::scan_tables;
use crate::types::{Cell, CellContent, CellKey, CellStyle, Column, Row, RowGroup, Table};

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentCell {
    pub rowspan: u32,
    pub colspan: u32,
    pub style: CellStyle,
    pub content: CellContent,
}

/// One source row. A row without cells is a placeholder kept alive by
/// rowspans from above.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FragmentRow {
    pub group: RowGroup,
    pub cells: Vec<FragmentCell>,
}

/// Cells copied out of a table, detached from any ids.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableFragment {
    pub rows: Vec<FragmentRow>,
}

impl TableFragment {
    pub fn from_table(table: &Table) -> Self {
        Self {
            rows: table
                .rows
                .iter()
                .map(|row| FragmentRow {
                    group: row.group,
                    cells: row
                        .cells
                        .iter()
                        .map(|cell| FragmentCell {
                            rowspan: cell.rowspan,
                            colspan: cell.colspan,
                            style: cell.style.clone(),
                            content: cell.content.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// The first table found in a clipboard delta.
    pub fn from_delta(delta: &Delta) -> Result<Option<Self>> {
        Ok(scan_tables(delta)?
            .first()
            .map(|located| Self::from_table(&located.table)))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.cells.is_empty())
    }

    /// Grid slot of every cell, row by row.
    pub fn positions(&self) -> Vec<Vec<(usize, usize)>> {
        let spans: Vec<Vec<(usize, usize)>> = self
            .rows
            .iter()
            .map(|row| {
                row.cells
                    .iter()
                    .map(|c| (crate::grid::span(c.rowspan), crate::grid::span(c.colspan)))
                    .collect()
            })
            .collect();
        flow_layout(&spans)
    }

    pub fn extent(&self) -> Extent {
        let placements: Vec<Placement> = self
            .rows
            .iter()
            .zip(self.positions())
            .flat_map(|(row, positions)| {
                row.cells
                    .iter()
                    .zip(positions)
                    .map(|(cell, (r, c))| Placement {
                        key: CellKey::new("", ""),
                        row: r,
                        col: c,
                        rowspan: crate::grid::span(cell.rowspan),
                        colspan: crate::grid::span(cell.colspan),
                        order: 0,
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        accumulate_extent(&placements)
    }
}

/// Copy the selected cells into a standalone table with the same ids.
///
/// Columns and rows outside the selection's bounding block are dropped and
/// spans reaching out of it are clipped.
pub fn extract(table: &Table, selected: &[CellKey]) -> Option<Table> {
    let grid = table.grid();
    let rect = grid.bounds(selected)?;
    let keep: HashSet<&CellKey> = selected.iter().collect();
    let mut out = Table::new(table.id.clone(), table.full);
    out.align = table.align;
    out.columns = table
        .columns
        .get(rect.col..rect.col_end)
        .map(<[Column]>::to_vec)
        .unwrap_or_default();
    for (r, row) in table.rows.iter().enumerate() {
        if r < rect.row || r >= rect.row_end {
            continue;
        }
        let mut copy = Row {
            cells: Vec::new(),
            ..row.clone()
        };
        for cell in &row.cells {
            let key = CellKey {
                row: row.id.clone(),
                col: cell.col.clone(),
            };
            let Some(p) = grid.placement(&key) else {
                continue;
            };
            if !keep.contains(&key) || p.col < rect.col || p.col >= rect.col_end {
                continue;
            }
            let mut cell = cell.clone();
            cell.rowspan = to_span(p.row_end().min(rect.row_end) - p.row);
            cell.colspan = to_span(p.col_end().min(rect.col_end) - p.col);
            copy.cells.push(cell);
        }
        out.rows.push(copy);
    }
    repair_fragment(&mut out);
    Some(out)
}

fn to_span(n: usize) -> u32 {
    u32::try_from(n.max(1)).unwrap_or(u32::MAX)
}

/// Paste `fragment` over the destination cells. Returns `false` when there
/// was nothing to paste into.
pub fn paste(table: &mut Table, dest: &[CellKey], fragment: &TableFragment) -> Result<bool> {
    if fragment.is_empty() {
        return Ok(false);
    }
    let grid = table.grid();
    let placed = grid.in_document_order(dest);
    let Some(rect) = grid.bounds(placed.iter().map(|p| &p.key)) else {
        return Ok(false);
    };
    let dest_extent = accumulate_extent(placed.iter().copied());
    let placed: Vec<Placement> = placed.into_iter().cloned().collect();
    let keys: Vec<CellKey> = placed.iter().map(|p| p.key.clone()).collect();

    if fragment.extent() == dest_extent && grid.is_closed(&rect, &keys) {
        paste_exact(table, &placed, rect, fragment);
    } else {
        log::debug!(
            "paste extent {:?} does not fit destination {:?}; tiling content",
            fragment.extent(),
            dest_extent
        );
        paste_loop(table, &placed, fragment);
    }
    repair(table);
    Ok(true)
}

fn paste_exact(table: &mut Table, dest: &[Placement], rect: GridRect, fragment: &TableFragment) {
    let mut matched: HashSet<CellKey> = HashSet::new();
    let mut fresh: Vec<(usize, Cell)> = Vec::new();
    let mut incoming: Vec<GridRect> = Vec::new();

    for (row, positions) in fragment.rows.iter().zip(fragment.positions()) {
        for (src, (r, c)) in row.cells.iter().zip(positions) {
            let (r, c) = (rect.row + r, rect.col + c);
            let target = dest.iter().find(|p| p.row == r && p.col == c);
            let mut cell = match target {
                Some(p) => {
                    matched.insert(p.key.clone());
                    match table.cell(&p.key) {
                        Some(cell) => cell.clone(),
                        None => continue,
                    }
                }
                None => match table.columns.get(c) {
                    Some(col) => Cell::new(col.id.clone()),
                    None => continue,
                },
            };
            incoming.push(GridRect {
                row: r,
                col: c,
                row_end: r + crate::grid::span(src.rowspan),
                col_end: c + crate::grid::span(src.colspan),
            });
            cell.rowspan = src.rowspan;
            cell.colspan = src.colspan;
            cell.style = src.style.clone();
            cell.content = src.content.clone();
            match target {
                Some(p) => {
                    if let Some(slot) = table.cell_mut(&p.key) {
                        *slot = cell;
                    }
                }
                None => fresh.push((r, cell)),
            }
        }
    }

    // Only cells an incoming span now covers go away. Rows left without
    // cells are collapsed by repair.
    let subsumed: Vec<&CellKey> = dest
        .iter()
        .filter(|p| !matched.contains(&p.key))
        .filter(|p| incoming.iter().any(|span| span.contains_slot(p.row, p.col)))
        .map(|p| &p.key)
        .collect();
    for key in subsumed {
        table.take_cell(key);
    }
    for (r, cell) in fresh {
        table.insert_cell_sorted(r, cell);
    }
}

/// Tile source content over the destination: destination row `r`, cell
/// `c` takes source row `r mod rows`, cell `c mod len(that row)`.
fn paste_loop(table: &mut Table, dest: &[Placement], fragment: &TableFragment) {
    let source: Vec<&FragmentRow> = fragment.rows.iter().filter(|r| !r.cells.is_empty()).collect();
    if source.is_empty() {
        return;
    }
    let mut dest_rows: Vec<usize> = dest.iter().map(|p| p.row).collect();
    dest_rows.sort_unstable();
    dest_rows.dedup();

    for (r, row) in dest_rows.iter().enumerate() {
        let Some(src_row) = source.get(r % source.len()) else {
            continue;
        };
        let mut in_row: Vec<&Placement> = dest.iter().filter(|p| p.row == *row).collect();
        in_row.sort_by_key(|p| p.col);
        for (c, p) in in_row.into_iter().enumerate() {
            let Some(src) = src_row.cells.get(c % src_row.cells.len()) else {
                continue;
            };
            if let Some(cell) = table.cell_mut(&p.key) {
                cell.content = src.content.clone();
            }
        }
    }
}
