//! Occupancy map and span accounting shared by every structural operation.
//!
//! The tree records spans by count from a starting column id; the map turns
//! that into grid coordinates so operations can reason about which cell
//! owns which slot.

use std::collections::{BTreeMap, HashMap};

use crate::types::{CellKey, ColId, Table};

/// Where one cell sits in the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub key: CellKey,
    pub row: usize,
    pub col: usize,
    pub rowspan: usize,
    pub colspan: usize,
    /// Position of the cell in document order.
    pub order: usize,
}

impl Placement {
    pub fn row_end(&self) -> usize {
        self.row + self.rowspan
    }

    pub fn col_end(&self) -> usize {
        self.col + self.colspan
    }

    pub fn covers(&self, row: usize, col: usize) -> bool {
        row >= self.row && row < self.row_end() && col >= self.col && col < self.col_end()
    }

    pub fn rect(&self) -> GridRect {
        GridRect {
            row: self.row,
            col: self.col,
            row_end: self.row_end(),
            col_end: self.col_end(),
        }
    }
}

/// Half-open rectangle of grid slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRect {
    pub row: usize,
    pub col: usize,
    pub row_end: usize,
    pub col_end: usize,
}

impl GridRect {
    pub fn rows(&self) -> usize {
        self.row_end - self.row
    }

    pub fn cols(&self) -> usize {
        self.col_end - self.col
    }

    pub fn contains_slot(&self, row: usize, col: usize) -> bool {
        row >= self.row && row < self.row_end && col >= self.col && col < self.col_end
    }

    pub fn contains_rect(&self, other: &GridRect) -> bool {
        other.row >= self.row
            && other.row_end <= self.row_end
            && other.col >= self.col
            && other.col_end <= self.col_end
    }

    #[must_use]
    pub fn union(&self, other: &GridRect) -> GridRect {
        GridRect {
            row: self.row.min(other.row),
            col: self.col.min(other.col),
            row_end: self.row_end.max(other.row_end),
            col_end: self.col_end.max(other.col_end),
        }
    }
}

/// Rows x columns covered by a group of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extent {
    pub rows: usize,
    pub cols: usize,
}

/// Grid occupancy of a table.
#[derive(Debug, Clone)]
pub struct GridMap {
    rows: usize,
    cols: usize,
    slots: Vec<Option<usize>>,
    placements: Vec<Placement>,
    by_key: HashMap<CellKey, usize>,
    /// Slots claimed by more than one cell.
    overlaps: usize,
    /// Cells reaching past the last row or column.
    overflows: usize,
    /// Cells whose column id is not a column of the table.
    orphans: usize,
}

impl GridMap {
    pub fn build(table: &Table) -> Self {
        let rows = table.rows.len();
        let cols = table.columns.len();
        let col_index: HashMap<&ColId, usize> = table
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (&c.id, i))
            .collect();

        let mut map = GridMap {
            rows,
            cols,
            slots: vec![None; rows * cols],
            placements: Vec::new(),
            by_key: HashMap::new(),
            overlaps: 0,
            overflows: 0,
            orphans: 0,
        };

        for (r, row) in table.rows.iter().enumerate() {
            for cell in &row.cells {
                let Some(&c) = col_index.get(&cell.col) else {
                    map.orphans += 1;
                    continue;
                };
                let placement = Placement {
                    key: CellKey {
                        row: row.id.clone(),
                        col: cell.col.clone(),
                    },
                    row: r,
                    col: c,
                    rowspan: span(cell.rowspan),
                    colspan: span(cell.colspan),
                    order: map.placements.len(),
                };
                if placement.row_end() > rows || placement.col_end() > cols {
                    map.overflows += 1;
                }
                let order = placement.order;
                for rr in r..placement.row_end().min(rows) {
                    for cc in c..placement.col_end().min(cols) {
                        if let Some(slot) = map.slots.get_mut(rr * cols + cc) {
                            if slot.is_some() {
                                map.overlaps += 1;
                            } else {
                                *slot = Some(order);
                            }
                        }
                    }
                }
                map.by_key.insert(placement.key.clone(), order);
                map.placements.push(placement);
            }
        }
        map
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// All placed cells in document order.
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn placement(&self, key: &CellKey) -> Option<&Placement> {
        self.by_key.get(key).and_then(|&i| self.placements.get(i))
    }

    /// The cell occupying slot `(row, col)`.
    pub fn owner(&self, row: usize, col: usize) -> Option<&Placement> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.slots
            .get(row * self.cols + col)
            .copied()
            .flatten()
            .and_then(|i| self.placements.get(i))
    }

    /// Own plus carried-over colspans in `row` (filled slots).
    pub fn row_coverage(&self, row: usize) -> usize {
        (0..self.cols)
            .filter(|&c| self.owner(row, c).is_some())
            .count()
    }

    /// Every slot filled exactly once, by cells of known columns.
    pub fn is_rectangular(&self) -> bool {
        self.overlaps == 0
            && self.overflows == 0
            && self.orphans == 0
            && (0..self.rows).all(|r| self.row_coverage(r) == self.cols)
    }

    /// Bounding rectangle of the given cells.
    pub fn bounds<'a>(&self, keys: impl IntoIterator<Item = &'a CellKey>) -> Option<GridRect> {
        keys.into_iter()
            .filter_map(|k| self.placement(k))
            .map(Placement::rect)
            .reduce(|a, b| a.union(&b))
    }

    /// True when the cells tile `rect` exactly: every slot of `rect` is
    /// owned by one of them and none reaches outside it.
    pub fn is_closed(&self, rect: &GridRect, keys: &[CellKey]) -> bool {
        let mut inside = 0usize;
        for key in keys {
            let Some(p) = self.placement(key) else {
                return false;
            };
            if !rect.contains_rect(&p.rect()) {
                return false;
            }
            inside += p.rowspan * p.colspan;
        }
        for r in rect.row..rect.row_end {
            for c in rect.col..rect.col_end {
                match self.owner(r, c) {
                    Some(owner) if keys.contains(&owner.key) => {}
                    _ => return false,
                }
            }
        }
        inside == rect.rows() * rect.cols()
    }

    /// Placements of the given keys, sorted into document order.
    pub fn in_document_order<'a>(
        &self,
        keys: impl IntoIterator<Item = &'a CellKey>,
    ) -> Vec<&Placement> {
        let mut placed: Vec<&Placement> = keys
            .into_iter()
            .filter_map(|k| self.placement(k))
            .collect();
        placed.sort_by_key(|p| p.order);
        placed.dedup_by_key(|p| p.order);
        placed
    }
}

pub(crate) fn span(n: u32) -> usize {
    usize::try_from(n.max(1)).unwrap_or(1)
}

/// Extent of a group of cells: the largest accumulated rowspan over any
/// column and the largest accumulated colspan over any row.
///
/// For cells tiling a rectangle both equal the rectangle's size; for a
/// ragged group they describe the smallest rectangle able to hold the
/// longest column and row.
pub fn accumulate_extent<'a>(cells: impl IntoIterator<Item = &'a Placement>) -> Extent {
    let mut per_col: BTreeMap<usize, usize> = BTreeMap::new();
    let mut per_row: BTreeMap<usize, usize> = BTreeMap::new();
    for cell in cells {
        for c in cell.col..cell.col_end() {
            *per_col.entry(c).or_default() += cell.rowspan;
        }
        for r in cell.row..cell.row_end() {
            *per_row.entry(r).or_default() += cell.colspan;
        }
    }
    Extent {
        rows: per_col.values().copied().max().unwrap_or(0),
        cols: per_row.values().copied().max().unwrap_or(0),
    }
}

/// Place rows of `(rowspan, colspan)` cells the way HTML lays out a
/// `<table>`: each cell takes the first slot of its row not already
/// claimed by a rowspan from above. Returns `(row, col)` per cell.
pub fn flow_layout(rows: &[Vec<(usize, usize)>]) -> Vec<Vec<(usize, usize)>> {
    let mut taken: Vec<Vec<bool>> = Vec::new();
    let mut out = Vec::with_capacity(rows.len());
    for (r, row) in rows.iter().enumerate() {
        let mut col = 0usize;
        let mut placed = Vec::with_capacity(row.len());
        for &(rowspan, colspan) in row {
            while is_taken(&taken, r, col) {
                col += 1;
            }
            placed.push((r, col));
            for rr in r..r + rowspan.max(1) {
                if taken.len() <= rr {
                    taken.resize(rr + 1, Vec::new());
                }
                if let Some(line) = taken.get_mut(rr) {
                    let end = col + colspan.max(1);
                    if line.len() < end {
                        line.resize(end, false);
                    }
                    for slot in line.iter_mut().take(end).skip(col) {
                        *slot = true;
                    }
                }
            }
            col += colspan.max(1);
        }
        out.push(placed);
    }
    out
}

fn is_taken(taken: &[Vec<bool>], row: usize, col: usize) -> bool {
    taken
        .get(row)
        .and_then(|line| line.get(col))
        .copied()
        .unwrap_or(false)
}
