//! Data types for the table engine.

mod attrs;
mod content;
mod geometry;
mod ids;
mod selection;
mod table;

pub use attrs::*;
pub use content::*;
pub use geometry::*;
pub use ids::*;
pub use selection::*;
pub use table::*;
