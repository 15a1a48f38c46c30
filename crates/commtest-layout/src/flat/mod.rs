//! Named-row/named-column tables with independently enabled cells.

mod reduce;
mod render;

pub use reduce::{reconcile, reduce, TableAction};
pub use render::{
    flat_input_cells, render, RenderedCell, RenderedInput, RenderedRow, RenderedTable, PLACEHOLDER,
};
