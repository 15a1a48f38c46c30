use commtest_core::InputId;
use commtest_model::{CellPosition, ScalarType, TableLayoutConfig};
use serde::Serialize;

use crate::key::{CellKey, FieldErrors, InputCell, RawValue, ValueMap};

/// Text shown in positions that accept no input.
pub const PLACEHOLDER: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedTable {
    pub header_rows: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<RenderedRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedRow {
    pub name: String,
    pub cells: Vec<RenderedCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedCell {
    Placeholder,
    Input(RenderedInput),
}

/// One editable control with its current value and inline error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedInput {
    pub key: String,
    pub input_type: ScalarType,
    pub label: Option<String>,
    pub unit: Option<String>,
    pub value: Option<RawValue>,
    pub error: Option<String>,
}

impl RenderedInput {
    pub(crate) fn for_key(
        key: &CellKey,
        input_type: ScalarType,
        label: Option<String>,
        unit: Option<String>,
        values: &ValueMap,
        errors: &FieldErrors,
    ) -> Self {
        Self {
            key: key.to_string(),
            input_type,
            label,
            unit,
            value: values.get(key).cloned(),
            error: errors.get(key).cloned(),
        }
    }
}

#[must_use]
pub fn render(
    layout: &TableLayoutConfig,
    input_id: &InputId,
    values: &ValueMap,
    errors: &FieldErrors,
) -> RenderedTable {
    let rows = layout
        .rows
        .iter()
        .enumerate()
        .map(|(r, name)| RenderedRow {
            name: name.clone(),
            cells: (0..layout.columns.len())
                .map(|c| {
                    let pos = CellPosition::new(r, c);
                    match layout.enabled_cell(pos) {
                        Some(cell) => RenderedCell::Input(RenderedInput::for_key(
                            &CellKey::cell(input_id.clone(), pos),
                            cell.input_type,
                            cell.label.clone(),
                            cell.unit.clone(),
                            values,
                            errors,
                        )),
                        None => RenderedCell::Placeholder,
                    }
                })
                .collect(),
        })
        .collect();
    RenderedTable {
        header_rows: layout.header_rows.clone(),
        columns: layout.columns.clone(),
        rows,
    }
}

/// Every enabled cell, row-major.
#[must_use]
pub fn flat_input_cells(layout: &TableLayoutConfig, input_id: &InputId) -> Vec<InputCell> {
    let mut cells: Vec<InputCell> = layout
        .enabled_cells()
        .filter(|c| layout.in_bounds(c.position()))
        .map(|c| InputCell {
            key: CellKey::cell(input_id.clone(), c.position()),
            input_type: c.input_type,
            label: c.label.clone(),
            unit: c.unit.clone(),
            expectation: c.expectation,
        })
        .collect();
    cells.sort_by(|a, b| a.key.cmp(&b.key));
    cells.dedup_by(|a, b| a.key == b.key);
    cells
}
