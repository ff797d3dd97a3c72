//! Drag Reorder Engine: moving a band of rows or columns.
//!
//! A session snapshots the track geometry when the drag starts, answers
//! "where would this drop land" on every pointer move, and on drop emits a
//! patch that cuts the band's runs out of the document and re-inserts them
//! at the target. Cell content and attributes travel untouched.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::delta::Splice;
use crate::error::Result;
use crate::grid::GridMap;
use crate::layout::Track;
use crate::sync::{table_splices, KeyedGroup, LocatedTable, SegKey};
use crate::types::{CellKey, Table, TableId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Rows,
    Cols,
}

/// Why a drag could not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragRejection {
    /// Nothing selected in this table.
    Empty,
    /// Closing the band under spans swallowed the whole axis.
    SpanningAll,
}

/// State of an in-progress drag.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub table: TableId,
    pub axis: Axis,
    /// Track indices being dragged, closed under spans.
    pub band: Range<usize>,
    pub tracks: Vec<Track>,
    pub target: Option<usize>,
}

/// Grow `band` until no cell crosses its edges along `axis`.
fn close_band(grid: &GridMap, axis: Axis, mut band: Range<usize>) -> Range<usize> {
    loop {
        let mut grown = band.clone();
        for p in grid.placements() {
            let (start, end) = extent_on(axis, p.row, p.row_end(), p.col, p.col_end());
            if start < grown.end && end > grown.start {
                grown.start = grown.start.min(start);
                grown.end = grown.end.max(end);
            }
        }
        if grown == band {
            return band;
        }
        band = grown;
    }
}

fn extent_on(axis: Axis, row: usize, row_end: usize, col: usize, col_end: usize) -> (usize, usize) {
    match axis {
        Axis::Rows => (row, row_end),
        Axis::Cols => (col, col_end),
    }
}

fn axis_len(table: &Table, axis: Axis) -> usize {
    match axis {
        Axis::Rows => table.rows.len(),
        Axis::Cols => table.columns.len(),
    }
}

/// True when the band, once closed under spans, covers the whole axis.
pub fn is_spanning_all(table: &Table, axis: Axis, selected: &[CellKey]) -> bool {
    matches!(
        DragSession::begin(table, axis, selected, Vec::new()),
        Err(DragRejection::SpanningAll)
    )
}

impl DragSession {
    /// Start dragging the rows or columns touched by `selected`.
    /// `tracks` is the geometry of every row (or column) at drag start.
    pub fn begin(
        table: &Table,
        axis: Axis,
        selected: &[CellKey],
        tracks: Vec<Track>,
    ) -> std::result::Result<Self, DragRejection> {
        let grid = table.grid();
        let placed = grid.in_document_order(selected);
        let start = placed
            .iter()
            .map(|p| extent_on(axis, p.row, p.row_end(), p.col, p.col_end()).0)
            .min();
        let end = placed
            .iter()
            .map(|p| extent_on(axis, p.row, p.row_end(), p.col, p.col_end()).1)
            .max();
        let (Some(start), Some(end)) = (start, end) else {
            return Err(DragRejection::Empty);
        };
        let band = close_band(&grid, axis, start..end);
        if band.start == 0 && band.end >= axis_len(table, axis) {
            log::debug!("drag in table {} rejected: band spans the whole axis", table.id);
            return Err(DragRejection::SpanningAll);
        }
        Ok(Self {
            table: table.id.clone(),
            axis,
            band,
            tracks,
            target: None,
        })
    }

    /// Update the drop target for a pointer at `pointer` along the axis.
    ///
    /// The target is the first track whose midpoint lies past the pointer.
    /// Positions inside or at the edges of the band, and boundaries cut by
    /// a spanning cell, are not valid targets.
    pub fn update(&mut self, table: &Table, pointer: f32) -> Option<usize> {
        let len = self.tracks.len();
        let index = self
            .tracks
            .iter()
            .position(|t| t.midpoint() > pointer)
            .unwrap_or(len)
            .min(len);
        self.target = if self.is_valid_target(table, index) {
            Some(index)
        } else {
            None
        };
        self.target
    }

    fn is_valid_target(&self, table: &Table, index: usize) -> bool {
        if index >= self.band.start && index <= self.band.end {
            return false;
        }
        if index > axis_len(table, self.axis) {
            return false;
        }
        !table.grid().placements().iter().any(|p| {
            let (start, end) = extent_on(self.axis, p.row, p.row_end(), p.col, p.col_end());
            start < index && index < end
        })
    }

    /// The patch for dropping at the current target, plus the moved tree.
    /// `None` when there is no valid target.
    pub fn drop_splices(&self, located: &LocatedTable) -> Result<Option<(Vec<Splice>, Table)>> {
        let Some(target) = self.target else {
            return Ok(None);
        };
        let table = &located.table;
        if self.band.end > axis_len(table, self.axis) || !self.is_valid_target(table, target) {
            return Ok(None);
        }
        let mut moved = table.clone();
        let splices = match self.axis {
            Axis::Rows => {
                move_rows(&mut moved, self.band.clone(), target);
                row_splices(located, self.band.clone(), target)
            }
            Axis::Cols => {
                move_cols(&mut moved, self.band.clone(), target);
                col_splices(located, self.band.clone(), target)
            }
        };
        let splices = match splices {
            Some(splices) => splices,
            None => table_splices(located, Some(&moved))?,
        };
        Ok(Some((splices, moved)))
    }
}

fn landing(band: &Range<usize>, target: usize) -> usize {
    if target > band.start {
        target - band.len()
    } else {
        target
    }
}

/// Move the rows in `band` so they start at `target` (an index into the
/// table before the move).
pub fn move_rows(table: &mut Table, band: Range<usize>, target: usize) {
    if band.end > table.rows.len() {
        return;
    }
    let at = landing(&band, target);
    let rows: Vec<_> = table.rows.drain(band).collect();
    let tail = table.rows.split_off(at.min(table.rows.len()));
    table.rows.extend(rows);
    table.rows.extend(tail);
}

/// Move the columns in `band` so they start at `target`, keeping every
/// row's cells in column order.
pub fn move_cols(table: &mut Table, band: Range<usize>, target: usize) {
    if band.end > table.columns.len() {
        return;
    }
    let at = landing(&band, target);
    let cols: Vec<_> = table.columns.drain(band).collect();
    let tail = table.columns.split_off(at.min(table.columns.len()));
    table.columns.extend(cols);
    table.columns.extend(tail);
    let order: std::collections::HashMap<_, _> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.clone(), i))
        .collect();
    for row in &mut table.rows {
        row.cells
            .sort_by_key(|c| order.get(&c.col).copied().unwrap_or(usize::MAX));
    }
}

/// Indices into `groups` of the band's groups, if they are contiguous.
fn contiguous(indices: &[usize]) -> Option<Range<usize>> {
    let first = *indices.first()?;
    let last = *indices.last()?;
    (last - first + 1 == indices.len()).then_some(first..last + 1)
}

fn span_of(groups: &[KeyedGroup], range: Range<usize>) -> Option<(usize, usize, Vec<crate::delta::Op>)> {
    let slice = groups.get(range)?;
    let start = slice.first()?.offset;
    let end = slice.last()?.end();
    Some((start, end - start, slice.iter().flat_map(KeyedGroup::ops).collect()))
}

fn row_splices(located: &LocatedTable, band: Range<usize>, target: usize) -> Option<Vec<Splice>> {
    let table = &located.table;
    let row_of = |g: &KeyedGroup| match &g.key {
        SegKey::Cell(key) => table.row_index(&key.row),
        _ => None,
    };
    let band_groups: Vec<usize> = located
        .groups
        .iter()
        .enumerate()
        .filter(|(_, g)| row_of(g).is_some_and(|r| band.contains(&r)))
        .map(|(i, _)| i)
        .collect();
    let (at, len, ops) = span_of(&located.groups, contiguous(&band_groups)?)?;

    let insert_at = if target >= table.rows.len() {
        located
            .groups
            .iter()
            .filter(|g| matches!(g.key, SegKey::Cell(_)))
            .map(KeyedGroup::end)
            .max()?
    } else {
        located
            .groups
            .iter()
            .find(|g| row_of(g) == Some(target))?
            .offset
    };
    Some(vec![Splice::delete(at, len), Splice::insert(insert_at, ops)])
}

fn col_splices(located: &LocatedTable, band: Range<usize>, target: usize) -> Option<Vec<Splice>> {
    let table = &located.table;
    let col_of = |g: &KeyedGroup| match &g.key {
        SegKey::Col(col) => table.col_index(col),
        SegKey::Cell(key) => table.col_index(&key.col),
        SegKey::Caption => None,
    };
    let mut splices = Vec::new();

    let mut runs: Vec<Vec<usize>> = Vec::new();
    let cols: Vec<usize> = located
        .groups
        .iter()
        .enumerate()
        .filter(|(_, g)| matches!(g.key, SegKey::Col(_)))
        .map(|(i, _)| i)
        .collect();
    runs.push(cols);
    for row in &table.rows {
        let cells: Vec<usize> = located
            .groups
            .iter()
            .enumerate()
            .filter(|(_, g)| matches!(&g.key, SegKey::Cell(key) if key.row == row.id))
            .map(|(i, _)| i)
            .collect();
        if !cells.is_empty() {
            runs.push(cells);
        }
    }

    for run in runs {
        contiguous(&run)?;
        let band_idx: Vec<usize> = run
            .iter()
            .copied()
            .filter(|&i| located.groups.get(i).and_then(|g| col_of(g)).is_some_and(|c| band.contains(&c)))
            .collect();
        if band_idx.is_empty() {
            continue;
        }
        let before: Vec<usize> = run
            .iter()
            .copied()
            .filter(|&i| {
                located
                    .groups
                    .get(i)
                    .and_then(|g| col_of(g))
                    .is_some_and(|c| !band.contains(&c) && c < target)
            })
            .collect();
        let insert_at = match before.last() {
            Some(&i) => located.groups.get(i)?.end(),
            None => located.groups.get(*run.first()?)?.offset,
        };
        let (at, len, ops) = span_of(&located.groups, contiguous(&band_idx)?)?;
        if insert_at == at || insert_at == at + len {
            continue;
        }
        splices.push(Splice::delete(at, len));
        splices.push(Splice::insert(insert_at, ops));
    }
    Some(splices)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::types::IdGenerator;

    fn tracks(n: usize) -> Vec<Track> {
        (0..n)
            .map(|i| Track {
                pos: crate::types::count_f32(i) * 10.0,
                size: 10.0,
            })
            .collect()
    }

    fn key(table: &Table, r: usize, c: usize) -> CellKey {
        CellKey {
            row: table.rows[r].id.clone(),
            col: table.columns[c].id.clone(),
        }
    }

    #[test]
    fn test_band_closes_under_rowspan() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 4, 2, false, 100.0);
        table.rows[1].cells[0].rowspan = 2;
        table.rows[2].cells.remove(0);
        let sel = vec![key(&table, 1, 1)];
        let session = DragSession::begin(&table, Axis::Rows, &sel, tracks(4)).unwrap();
        assert_eq!(session.band, 1..3);
    }

    #[test]
    fn test_spanning_all_is_rejected() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 2, 2, false, 100.0);
        table.rows[0].cells[0].rowspan = 2;
        table.rows[1].cells.remove(0);
        let sel = vec![key(&table, 1, 1)];
        assert!(is_spanning_all(&table, Axis::Rows, &sel));
    }

    #[test]
    fn test_targets_inside_band_are_invalid() {
        let mut ids = IdGenerator::new();
        let table = Table::balanced(&mut ids, 4, 1, false, 100.0);
        let sel = vec![key(&table, 1, 0)];
        let mut session = DragSession::begin(&table, Axis::Rows, &sel, tracks(4)).unwrap();
        assert_eq!(session.update(&table, 12.0), None);
        assert_eq!(session.update(&table, 2.0), Some(0));
        assert_eq!(session.update(&table, 38.0), Some(4));
        assert_eq!(session.update(&table, 1000.0), Some(4));
    }

    #[test]
    fn test_target_cutting_a_span_is_invalid() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 4, 2, false, 100.0);
        table.rows[2].cells[0].rowspan = 2;
        table.rows[3].cells.remove(0);
        let sel = vec![key(&table, 0, 0)];
        let mut session = DragSession::begin(&table, Axis::Rows, &sel, tracks(4)).unwrap();
        assert_eq!(session.update(&table, 28.0), None);
        assert_eq!(session.update(&table, 22.0), Some(2));
    }

    #[test]
    fn test_move_rows_down() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 4, 1, false, 100.0);
        let order: Vec<_> = table.rows.iter().map(|r| r.id.clone()).collect();
        move_rows(&mut table, 0..1, 3);
        let now: Vec<_> = table.rows.iter().map(|r| r.id.clone()).collect();
        assert_eq!(now, vec![order[1].clone(), order[2].clone(), order[0].clone(), order[3].clone()]);
    }
}
