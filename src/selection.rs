//! Selection Geometry Engine: pointer rectangles to cell sets.
//!
//! A drag from one point to another selects every cell the rectangle
//! reaches into, then keeps growing the rectangle over spanning cells until
//! it is closed: the result is always an axis-aligned block that contains
//! each of its spanning cells in full.

use crate::layout::{CellBox, TableLayout, Track};
use crate::types::{CellKey, Point, Rect, Selection, SelectionType, TableId};

/// Hit testing over one table's rendered cell boxes.
#[derive(Debug, Clone)]
pub struct SelectionEngine {
    table: TableId,
    /// Cell boxes in document order.
    boxes: Vec<CellBox>,
    rows: Vec<Track>,
    cols: Vec<Track>,
    bounds: Rect,
    tolerance: f32,
}

impl SelectionEngine {
    /// Engine over measured geometry. `boxes` must be in document order.
    pub fn new(
        table: TableId,
        boxes: Vec<CellBox>,
        rows: Vec<Track>,
        cols: Vec<Track>,
        tolerance: f32,
    ) -> Self {
        let bounds = boxes
            .iter()
            .map(|b| b.rect)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();
        Self {
            table,
            boxes,
            rows,
            cols,
            bounds,
            tolerance,
        }
    }

    /// Engine over a computed layout.
    pub fn from_layout(table: TableId, layout: &TableLayout, tolerance: f32) -> Self {
        Self::new(
            table,
            layout.boxes.clone(),
            layout.row_tracks(),
            layout.col_tracks(),
            tolerance,
        )
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Cells selected by a pointer drag from `start` to `end`.
    pub fn compute_selected_cells(&self, start: Point, end: Point) -> Selection {
        let seed = Rect::from_points(start, end).clamp_to(&self.bounds);
        Selection::new(SelectionType::CellRange, self.table.clone(), self.grow(seed))
    }

    /// Row header click (`anchor == focus`) or shift-click.
    pub fn select_rows(&self, anchor: usize, focus: usize) -> Selection {
        let cells = self
            .band(&self.rows, anchor, focus)
            .map(|(from, to)| {
                self.grow(Rect::from_points(
                    Point::new(self.bounds.x, from),
                    Point::new(self.bounds.right(), to),
                ))
            })
            .unwrap_or_default();
        let mut selection = Selection::new(SelectionType::RowRange, self.table.clone(), cells);
        selection.anchor = Some(anchor);
        selection
    }

    /// Column header click (`anchor == focus`) or shift-click.
    pub fn select_cols(&self, anchor: usize, focus: usize) -> Selection {
        let cells = self
            .band(&self.cols, anchor, focus)
            .map(|(from, to)| {
                self.grow(Rect::from_points(
                    Point::new(from, self.bounds.y),
                    Point::new(to, self.bounds.bottom()),
                ))
            })
            .unwrap_or_default();
        let mut selection = Selection::new(SelectionType::ColumnRange, self.table.clone(), cells);
        selection.anchor = Some(anchor);
        selection
    }

    /// Corner click.
    pub fn select_all(&self) -> Selection {
        Selection::new(SelectionType::All, self.table.clone(), self.grow(self.bounds))
    }

    fn band(&self, tracks: &[Track], anchor: usize, focus: usize) -> Option<(f32, f32)> {
        let from = tracks.get(anchor.min(focus))?;
        let to = tracks.get(anchor.max(focus))?;
        Some((from.pos, to.end()))
    }

    /// Grow `rect` to a fixed point over the cell pool.
    fn grow(&self, mut rect: Rect) -> Vec<CellKey> {
        let mut pool: Vec<usize> = (0..self.boxes.len()).collect();
        let mut taken: Vec<usize> = Vec::new();
        loop {
            let before = taken.len();
            pool.retain(|&i| match self.boxes.get(i) {
                Some(cell) if cell.rect.hits(&rect, self.tolerance) => {
                    rect = rect.union(&cell.rect);
                    taken.push(i);
                    false
                }
                _ => true,
            });
            if taken.len() == before {
                break;
            }
        }
        taken.sort_unstable();
        taken
            .into_iter()
            .filter_map(|i| self.boxes.get(i).map(|b| b.key.clone()))
            .collect()
    }
}
