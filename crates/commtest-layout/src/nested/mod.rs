//! Recursive grids with merged cells and embedded sub-tables.

mod ops;
mod render;
mod selection;

pub use ops::{check_coverage, nested_input_cells, reduce, LayoutPath, NestedAction};
pub use render::{render, RenderedGrid, RenderedSlot, SlotBody};
pub use selection::{BuilderSelection, Gesture, GestureOutcome, NestedBuilder};
