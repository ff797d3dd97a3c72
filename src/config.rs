//! Editor limits and defaults.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for table creation, resizing and hit testing.
///
/// Every field has a default, so a partial JSON object is enough:
///
/// ```
/// let config = rtgrid::TableConfig::from_json(r#"{"maxRows": 10}"#).unwrap();
/// assert_eq!(config.max_rows, 10);
/// assert_eq!(config.max_cols, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableConfig {
    /// Narrowest a pixel-sized column may be dragged or set.
    pub min_col_width_px: f32,
    /// Narrowest a percent-sized column may be, in percent.
    pub min_col_width_percent: f32,
    pub min_row_height_px: f32,
    /// Exclusive upper bound on rows for a new table.
    pub max_rows: usize,
    /// Exclusive upper bound on columns for a new table.
    pub max_cols: usize,
    pub default_col_width_px: f32,
    /// Rendered height of a row without an explicit height.
    pub default_row_height_px: f32,
    /// How far a selection rectangle must reach into a cell to select it.
    pub selection_tolerance_px: f32,
    pub recent_colors_limit: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            min_col_width_px: 40.0,
            min_col_width_percent: 5.0,
            min_row_height_px: 24.0,
            max_rows: 30,
            max_cols: 30,
            default_col_width_px: 100.0,
            default_row_height_px: 32.0,
            selection_tolerance_px: 3.0,
            recent_colors_limit: 10,
        }
    }
}

impl TableConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Minimum width for a column of a table with the given sizing mode.
    pub fn min_col_width(&self, full: bool) -> f32 {
        if full {
            self.min_col_width_percent
        } else {
            self.min_col_width_px
        }
    }
}
