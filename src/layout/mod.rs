//! Synthetic geometry for a table.
//!
//! Hosts with a live rendering measure cells themselves and hand the rects
//! to the selection engine. Everywhere else (tests, the CLI, headless
//! editing) the layout is computed from column widths and row heights:
//! - Cumulative column and row positions
//! - Cell rectangles with spans applied
//! - Binary search for the track under a coordinate

mod table_layout;

pub use table_layout::{CellBox, TableLayout, Track};
