use commtest_core::InputId;
use commtest_model::{CellContent, CellPosition, NestedTableCell, NestedTableLayout, MAX_NESTED_DEPTH};
use serde::Serialize;

use crate::flat::RenderedInput;
use crate::key::{CellKey, FieldErrors, ValueMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedGrid {
    pub level: usize,
    pub header_rows: Vec<String>,
    pub rows: usize,
    pub columns: usize,
    pub slots: Vec<RenderedSlot>,
}

/// One anchored cell. Positions covered by a merged cell get no slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedSlot {
    pub position: CellPosition,
    pub row_span: usize,
    pub col_span: usize,
    pub body: SlotBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotBody {
    Empty,
    Header { text: String },
    Input(RenderedInput),
    Nested(Box<RenderedGrid>),
    DepthLimit,
}

#[must_use]
pub fn render(
    layout: &NestedTableLayout,
    input_id: &InputId,
    values: &ValueMap,
    errors: &FieldErrors,
) -> RenderedGrid {
    render_level(layout, &CellKey::scalar(input_id.clone()), 1, values, errors)
}

fn render_level(
    layout: &NestedTableLayout,
    parent: &CellKey,
    level: usize,
    values: &ValueMap,
    errors: &FieldErrors,
) -> RenderedGrid {
    let mut cells: Vec<&NestedTableCell> = layout
        .cells
        .iter()
        .filter(|c| layout.in_bounds(c.position()))
        .collect();
    cells.sort_by_key(|c| c.position());
    let slots = cells
        .into_iter()
        .map(|cell| {
            let key = parent.child(cell.position());
            let body = match &cell.content {
                CellContent::Empty => SlotBody::Empty,
                CellContent::Header { header_text } => SlotBody::Header {
                    text: header_text.clone(),
                },
                CellContent::Input(input) => SlotBody::Input(RenderedInput::for_key(
                    &key,
                    input.input_type,
                    input.label.clone(),
                    input.unit.clone(),
                    values,
                    errors,
                )),
                CellContent::NestedTable { .. } if level >= MAX_NESTED_DEPTH => {
                    SlotBody::DepthLimit
                }
                CellContent::NestedTable { nested_table } => SlotBody::Nested(Box::new(
                    render_level(nested_table, &key, level + 1, values, errors),
                )),
            };
            RenderedSlot {
                position: cell.position(),
                row_span: cell.row_span,
                col_span: cell.col_span,
                body,
            }
        })
        .collect();
    RenderedGrid {
        level,
        header_rows: layout.header_rows.clone(),
        rows: layout.rows,
        columns: layout.columns,
        slots,
    }
}
