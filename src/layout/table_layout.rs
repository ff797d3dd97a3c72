//! Pre-computed layout data for a table.
//!
//! Positions are computed once per table state, so hit testing and drag
//! target lookup are O(log n) binary searches over cumulative edges.

use serde::Serialize;

use crate::config::TableConfig;
use crate::types::{CellKey, Point, Rect, Table};

/// A cell and the rectangle it renders into.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellBox {
    pub key: CellKey,
    pub rect: Rect,
}

/// Position and size of one row or column along its axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Track {
    pub pos: f32,
    pub size: f32,
}

impl Track {
    pub fn end(&self) -> f32 {
        self.pos + self.size
    }

    pub fn midpoint(&self) -> f32 {
        self.pos + self.size / 2.0
    }
}

/// Pre-computed layout data for a table
#[derive(Debug, Clone)]
pub struct TableLayout {
    /// Cumulative column positions (`col_positions[i]` = x of column i's left edge)
    pub col_positions: Vec<f32>,
    /// Cumulative row positions (`row_positions[i]` = y of row i's top edge)
    pub row_positions: Vec<f32>,
    /// Cells in document order
    pub boxes: Vec<CellBox>,
}

impl TableLayout {
    /// Lay out `table` inside a container `container_width` pixels wide.
    ///
    /// Percent columns resolve against the container; rows without an
    /// explicit height get the configured default.
    pub fn new(table: &Table, config: &TableConfig, container_width: f32) -> Self {
        let widths: Vec<f32> = table
            .columns
            .iter()
            .map(|c| {
                if table.full {
                    c.width * container_width / 100.0
                } else {
                    c.width
                }
            })
            .collect();
        let heights: Vec<f32> = table
            .rows
            .iter()
            .map(|r| r.height.unwrap_or(config.default_row_height_px))
            .collect();
        Self::from_tracks(table, &widths, &heights)
    }

    /// Lay out with measured track sizes (e.g. rendered row heights).
    pub fn from_tracks(table: &Table, col_widths: &[f32], row_heights: &[f32]) -> Self {
        let col_positions = cumulative(col_widths);
        let row_positions = cumulative(row_heights);
        let grid = table.grid();
        let edge = |positions: &[f32], i: usize| {
            positions
                .get(i)
                .or_else(|| positions.last())
                .copied()
                .unwrap_or(0.0)
        };
        let boxes = grid
            .placements()
            .iter()
            .map(|p| {
                let x = edge(&col_positions, p.col);
                let y = edge(&row_positions, p.row);
                CellBox {
                    key: p.key.clone(),
                    rect: Rect::new(
                        x,
                        y,
                        edge(&col_positions, p.col_end()) - x,
                        edge(&row_positions, p.row_end()) - y,
                    ),
                }
            })
            .collect();
        Self {
            col_positions,
            row_positions,
            boxes,
        }
    }

    /// Get total width of the table
    pub fn total_width(&self) -> f32 {
        self.col_positions.last().copied().unwrap_or(0.0)
    }

    /// Get total height of the table
    pub fn total_height(&self) -> f32 {
        self.row_positions.last().copied().unwrap_or(0.0)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.total_width(), self.total_height())
    }

    pub fn cell_rect(&self, key: &CellKey) -> Option<Rect> {
        self.boxes.iter().find(|b| b.key == *key).map(|b| b.rect)
    }

    pub fn col_tracks(&self) -> Vec<Track> {
        tracks(&self.col_positions)
    }

    pub fn row_tracks(&self) -> Vec<Track> {
        tracks(&self.row_positions)
    }

    /// Find row at y position (binary search)
    pub fn row_at_y(&self, y: f32) -> Option<usize> {
        track_at(&self.row_positions, y)
    }

    /// Find column at x position (binary search)
    pub fn col_at_x(&self, x: f32) -> Option<usize> {
        track_at(&self.col_positions, x)
    }

    /// The cell rendered under `point`.
    pub fn hit_test(&self, point: Point) -> Option<&CellKey> {
        self.boxes
            .iter()
            .find(|b| b.rect.contains(point))
            .map(|b| &b.key)
    }
}

fn cumulative(sizes: &[f32]) -> Vec<f32> {
    let mut positions = Vec::with_capacity(sizes.len() + 1);
    let mut at = 0.0f32;
    for size in sizes {
        positions.push(at);
        at += size.max(0.0);
    }
    positions.push(at);
    positions
}

fn tracks(positions: &[f32]) -> Vec<Track> {
    positions
        .windows(2)
        .filter_map(|w| match w {
            [a, b] => Some(Track { pos: *a, size: b - a }),
            _ => None,
        })
        .collect()
}

fn track_at(positions: &[f32], at: f32) -> Option<usize> {
    let last = positions.len().checked_sub(2)?;
    if at < positions.first().copied()? || at > positions.last().copied()? {
        return None;
    }
    let i = match positions.binary_search_by(|pos| pos.partial_cmp(&at).unwrap_or(std::cmp::Ordering::Equal)) {
        Ok(i) => i,
        Err(i) => i.saturating_sub(1),
    };
    Some(i.min(last))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::types::IdGenerator;

    fn layout_3x3() -> (Table, TableLayout) {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 3, 3, false, 100.0);
        table.rows[0].cells[0].colspan = 2;
        table.rows[0].cells.remove(1);
        let layout = TableLayout::new(&table, &TableConfig::default(), 800.0);
        (table, layout)
    }

    #[test]
    fn test_basic_layout() {
        let (_, layout) = layout_3x3();
        assert_eq!(layout.total_width(), 300.0);
        assert_eq!(layout.total_height(), 96.0);
        assert_eq!(layout.boxes.len(), 8);
    }

    #[test]
    fn test_spanning_cell_rect() {
        let (table, layout) = layout_3x3();
        let key = table.cell_keys()[0].clone();
        assert_eq!(layout.cell_rect(&key), Some(Rect::new(0.0, 0.0, 200.0, 32.0)));
    }

    #[test]
    fn test_percent_columns_resolve_against_container() {
        let mut ids = IdGenerator::new();
        let table = Table::balanced(&mut ids, 1, 4, true, 100.0);
        let layout = TableLayout::new(&table, &TableConfig::default(), 800.0);
        assert_eq!(layout.total_width(), 800.0);
        assert_eq!(layout.col_tracks()[1], Track { pos: 200.0, size: 200.0 });
    }

    #[test]
    fn test_row_at_y() {
        let (_, layout) = layout_3x3();
        assert_eq!(layout.row_at_y(0.0), Some(0));
        assert_eq!(layout.row_at_y(10.0), Some(0));
        assert_eq!(layout.row_at_y(32.0), Some(1));
        assert_eq!(layout.row_at_y(96.0), Some(2));
        assert_eq!(layout.row_at_y(97.0), None);
    }

    #[test]
    fn test_col_at_x_and_hit_test() {
        let (table, layout) = layout_3x3();
        assert_eq!(layout.col_at_x(150.0), Some(1));
        let hit = layout.hit_test(Point::new(150.0, 10.0)).unwrap();
        assert_eq!(hit, &table.cell_keys()[0]);
    }
}
