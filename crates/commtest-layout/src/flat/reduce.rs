// SPDX-License-Identifier: Apache-2.0

use commtest_model::{CellPosition, Expectation, ScalarType, TableCellConfig, TableLayoutConfig};
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::error::{LayoutError, LayoutErrorCode};

#[derive(Debug, Clone, PartialEq)]
pub enum TableAction {
    AddRow { name: String },
    RemoveRow { index: usize },
    RenameRow { index: usize, name: String },
    AddColumn { name: String },
    RemoveColumn { index: usize },
    RenameColumn { index: usize, name: String },
    ToggleCell { at: CellPosition },
    SetCellType { at: CellPosition, input_type: ScalarType },
    ConfigureCell {
        at: CellPosition,
        label: Option<String>,
        unit: Option<String>,
        expectation: Option<Expectation>,
    },
    AddHeaderRow { text: String },
    SetHeaderRow { index: usize, text: String },
    RemoveHeaderRow { index: usize },
}

/// Ensures one cell entry per (row, column) pair in row-major order.
///
/// Missing positions become disabled number cells; entries outside the grid
/// and duplicates are dropped. Returns the input unchanged (borrowed) when it
/// already satisfies this, so repeated calls do not produce new values.
#[must_use]
pub fn reconcile(layout: &TableLayoutConfig) -> Cow<'_, TableLayoutConfig> {
    if layout.is_complete() && is_row_major(&layout.cells) {
        return Cow::Borrowed(layout);
    }
    let mut by_pos: BTreeMap<CellPosition, TableCellConfig> = BTreeMap::new();
    for cell in &layout.cells {
        if layout.in_bounds(cell.position()) {
            by_pos.entry(cell.position()).or_insert_with(|| cell.clone());
        }
    }
    let mut cells = Vec::with_capacity(layout.rows.len() * layout.columns.len());
    for r in 0..layout.rows.len() {
        for c in 0..layout.columns.len() {
            let pos = CellPosition::new(r, c);
            cells.push(
                by_pos
                    .remove(&pos)
                    .unwrap_or_else(|| TableCellConfig::disabled(r, c)),
            );
        }
    }
    Cow::Owned(TableLayoutConfig {
        columns: layout.columns.clone(),
        rows: layout.rows.clone(),
        cells,
        header_rows: layout.header_rows.clone(),
    })
}

fn is_row_major(cells: &[TableCellConfig]) -> bool {
    cells.windows(2).all(|w| w[0].position() < w[1].position())
}

/// Applies one builder action, returning the next layout. The input is never mutated.
pub fn reduce(
    layout: &TableLayoutConfig,
    action: TableAction,
) -> Result<TableLayoutConfig, LayoutError> {
    let mut next = reconcile(layout).into_owned();
    match action {
        TableAction::AddRow { name } => next.rows.push(name),
        TableAction::RemoveRow { index } => {
            check_index("row", index, next.rows.len())?;
            if next.rows.len() == 1 {
                return Err(LayoutError::new(
                    LayoutErrorCode::LastLine,
                    "table must keep at least one row",
                ));
            }
            next.rows.remove(index);
            next.cells.retain(|c| c.row_index != index);
            for cell in &mut next.cells {
                if cell.row_index > index {
                    cell.row_index -= 1;
                }
            }
        }
        TableAction::RenameRow { index, name } => {
            check_index("row", index, next.rows.len())?;
            next.rows[index] = name;
        }
        TableAction::AddColumn { name } => next.columns.push(name),
        TableAction::RemoveColumn { index } => {
            check_index("column", index, next.columns.len())?;
            if next.columns.len() == 1 {
                return Err(LayoutError::new(
                    LayoutErrorCode::LastLine,
                    "table must keep at least one column",
                ));
            }
            next.columns.remove(index);
            next.cells.retain(|c| c.column_index != index);
            for cell in &mut next.cells {
                if cell.column_index > index {
                    cell.column_index -= 1;
                }
            }
        }
        TableAction::RenameColumn { index, name } => {
            check_index("column", index, next.columns.len())?;
            next.columns[index] = name;
        }
        TableAction::ToggleCell { at } => {
            let cell = cell_mut(&mut next, at)?;
            cell.enabled = !cell.enabled;
        }
        TableAction::SetCellType { at, input_type } => {
            cell_mut(&mut next, at)?.input_type = input_type;
        }
        TableAction::ConfigureCell {
            at,
            label,
            unit,
            expectation,
        } => {
            let cell = cell_mut(&mut next, at)?;
            cell.label = label.filter(|l| !l.trim().is_empty());
            cell.unit = unit.filter(|u| !u.trim().is_empty());
            cell.expectation = expectation;
        }
        TableAction::AddHeaderRow { text } => next.header_rows.push(text),
        TableAction::SetHeaderRow { index, text } => {
            check_index("header row", index, next.header_rows.len())?;
            next.header_rows[index] = text;
        }
        TableAction::RemoveHeaderRow { index } => {
            check_index("header row", index, next.header_rows.len())?;
            next.header_rows.remove(index);
        }
    }
    Ok(reconcile(&next).into_owned())
}

fn check_index(what: &str, index: usize, len: usize) -> Result<(), LayoutError> {
    if index >= len {
        return Err(LayoutError::out_of_bounds(what, index, len));
    }
    Ok(())
}

fn cell_mut(
    layout: &mut TableLayoutConfig,
    at: CellPosition,
) -> Result<&mut TableCellConfig, LayoutError> {
    let (rows, cols) = (layout.rows.len(), layout.columns.len());
    layout.cell_mut(at).ok_or_else(|| {
        LayoutError::new(
            LayoutErrorCode::OutOfBounds,
            format!("cell {at} outside {rows}x{cols} table"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> TableLayoutConfig {
        TableLayoutConfig {
            columns: vec!["L1".to_string(), "L2".to_string()],
            rows: vec!["V".to_string(), "I".to_string()],
            cells: Vec::new(),
            header_rows: Vec::new(),
        }
    }

    #[test]
    fn reconcile_fills_missing_positions_as_disabled_numbers() {
        let layout = two_by_two();
        let done = reconcile(&layout);
        assert!(matches!(done, Cow::Owned(_)));
        assert_eq!(done.cells.len(), 4);
        assert!(done
            .cells
            .iter()
            .all(|c| !c.enabled && c.input_type == ScalarType::Number));
    }

    #[test]
    fn reconcile_is_reference_stable_when_complete() {
        let done = reconcile(&two_by_two()).into_owned();
        assert!(matches!(reconcile(&done), Cow::Borrowed(_)));
    }

    #[test]
    fn toggle_enables_a_cell() {
        let next = reduce(
            &two_by_two(),
            TableAction::ToggleCell {
                at: CellPosition::new(1, 0),
            },
        )
        .expect("toggle");
        assert!(next.enabled_cell(CellPosition::new(1, 0)).is_some());
        assert_eq!(next.enabled_cells().count(), 1);
    }
}
