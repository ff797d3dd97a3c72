//! Sizing, styling and caption edits. None of these change the grid shape.

use crate::config::TableConfig;
use crate::error::{Result, TableError};
use crate::types::{Align, Caption, CaptionSide, CellKey, CellStyle, ColId, Line, RowId, Table};

/// Resize one column, clamped to the minimum width.
///
/// In a percent table the right-hand neighbour (the left one for the last
/// column) gives or takes the difference so the total stays at 100.
pub fn set_column_width(
    table: &mut Table,
    col: &ColId,
    width: f32,
    config: &TableConfig,
) -> Result<bool> {
    let index = table.col_index(col).ok_or_else(|| {
        TableError::MissingAncestor(format!("column {col} not in table {}", table.id))
    })?;
    let min = config.min_col_width(table.full);
    let Some(old) = table.columns.get(index).map(|c| c.width) else {
        return Ok(false);
    };
    let mut width = width.max(min);

    if table.full {
        let neighbour = if index + 1 < table.columns.len() {
            index + 1
        } else if index > 0 {
            index - 1
        } else {
            return Ok(false);
        };
        let Some(other) = table.columns.get(neighbour).map(|c| c.width) else {
            return Ok(false);
        };
        let other_new = (other - (width - old)).max(min);
        width = old + (other - other_new);
        if let Some(c) = table.columns.get_mut(neighbour) {
            c.width = other_new;
        }
    }
    if (width - old).abs() < f32::EPSILON {
        return Ok(false);
    }
    if let Some(c) = table.columns.get_mut(index) {
        c.width = width;
    }
    Ok(true)
}

/// Set or clear a row's explicit height, clamped to the minimum.
pub fn set_row_height(
    table: &mut Table,
    row: &RowId,
    height: Option<f32>,
    config: &TableConfig,
) -> Result<bool> {
    let index = table.row_index(row).ok_or_else(|| {
        TableError::MissingAncestor(format!("row {row} not in table {}", table.id))
    })?;
    let height = height.map(|h| h.max(config.min_row_height_px));
    match table.rows.get_mut(index) {
        Some(r) if r.height != height => {
            r.height = height;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Overlay `style` on every selected cell.
pub fn set_cell_style(table: &mut Table, cells: &[CellKey], style: &CellStyle) -> Result<bool> {
    let mut changed = false;
    for key in cells {
        let pos = table.locate(key)?;
        if let Some(cell) = table
            .rows
            .get_mut(pos.row)
            .and_then(|r| r.cells.get_mut(pos.index))
        {
            let before = cell.style.clone();
            cell.style.merge(style);
            changed |= cell.style != before;
        }
    }
    Ok(changed)
}

pub fn set_alignment(table: &mut Table, align: Align) -> bool {
    if table.align == align {
        return false;
    }
    table.align = align;
    true
}

/// Switch between percent and pixel sizing. `table_width_px` is the
/// rendered width the percentages are taken against.
pub fn set_full(table: &mut Table, full: bool, table_width_px: f32) -> bool {
    if table.full == full {
        return false;
    }
    let total = table.total_width();
    for col in &mut table.columns {
        col.width = if full {
            if total > 0.0 {
                col.width * 100.0 / total
            } else {
                0.0
            }
        } else {
            col.width * table_width_px / 100.0
        };
    }
    table.full = full;
    true
}

/// Set (or with `None`, remove) the caption.
pub fn set_caption(table: &mut Table, caption: Option<(&str, CaptionSide)>) -> bool {
    let caption = caption.map(|(text, side)| Caption {
        side,
        line: Line::text(text),
    });
    if table.caption == caption {
        return false;
    }
    table.caption = caption;
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::types::IdGenerator;

    #[test]
    fn test_percent_resize_keeps_total() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 1, 4, true, 100.0);
        let col = table.columns[1].id.clone();
        let config = TableConfig::default();
        assert!(set_column_width(&mut table, &col, 40.0, &config).unwrap());
        assert!((table.columns[1].width - 40.0).abs() < 0.01);
        assert!((table.columns[2].width - 10.0).abs() < 0.01);
        assert!((table.total_width() - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_percent_resize_respects_neighbour_minimum() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 1, 2, true, 100.0);
        let col = table.columns[0].id.clone();
        set_column_width(&mut table, &col, 99.0, &TableConfig::default()).unwrap();
        assert!((table.columns[0].width - 95.0).abs() < 0.01);
        assert!((table.columns[1].width - 5.0).abs() < 0.01);
    }

    #[test]
    fn test_pixel_resize_clamps_to_minimum() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 1, 2, false, 100.0);
        let col = table.columns[0].id.clone();
        set_column_width(&mut table, &col, 3.0, &TableConfig::default()).unwrap();
        assert!((table.columns[0].width - 40.0).abs() < 0.01);
        assert!((table.columns[1].width - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_unknown_column_is_missing_ancestor() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 1, 1, false, 100.0);
        let err = set_column_width(&mut table, &ColId::new("x"), 50.0, &TableConfig::default());
        assert!(matches!(err, Err(TableError::MissingAncestor(_))));
    }

    #[test]
    fn test_set_full_converts_widths() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 1, 2, false, 100.0);
        table.columns[0].width = 300.0;
        assert!(set_full(&mut table, true, 400.0));
        assert!((table.columns[0].width - 75.0).abs() < 0.01);
        assert!(set_full(&mut table, false, 800.0));
        assert!((table.columns[0].width - 600.0).abs() < 0.01);
    }

    #[test]
    fn test_row_height_and_style() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 1, 1, false, 100.0);
        let row = table.rows[0].id.clone();
        let config = TableConfig::default();
        assert!(set_row_height(&mut table, &row, Some(10.0), &config).unwrap());
        assert_eq!(table.rows[0].height, Some(24.0));
        let keys = table.cell_keys();
        let style = CellStyle {
            background_color: Some("#ff0000".into()),
            ..CellStyle::default()
        };
        assert!(set_cell_style(&mut table, &keys, &style).unwrap());
        assert!(!set_cell_style(&mut table, &keys, &style).unwrap());
    }
}
