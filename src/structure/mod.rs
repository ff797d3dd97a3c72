//! Table Structure Engine.
//!
//! Every operation here edits a `Table` tree in place; the editor turns the
//! before/after pair into a single document patch. Operations end with a
//! `repair` so the grid is rectangular again before anything is serialized.

mod format;
mod insert;
mod merge;
mod remove;
mod repair;

pub use format::{
    set_alignment, set_caption, set_cell_style, set_column_width, set_full, set_row_height,
};
pub use insert::{append_col, append_row, new_table};
pub use merge::{merge_cells, split_cell};
pub use remove::{remove_col, remove_row};
pub use repair::{repair, repair_fragment};

use crate::grid::{GridMap, Placement};
use crate::types::CellKey;

/// Placements of the given keys that exist in the grid.
pub(crate) fn placed<'a>(grid: &'a GridMap, keys: &[CellKey]) -> Vec<&'a Placement> {
    grid.in_document_order(keys)
}
