// SPDX-License-Identifier: Apache-2.0

use commtest_core::{CellId, InputId};
use commtest_model::{
    CellContent, CellPosition, CellRect, NestedTableCell, NestedTableLayout, MAX_NESTED_DEPTH,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LayoutError, LayoutErrorCode};
use crate::key::{CellKey, InputCell};

/// Chain of nested-table cell positions from the root grid to a sub-grid.
/// The empty path addresses the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutPath(Vec<CellPosition>);

impl LayoutPath {
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn child(&self, pos: CellPosition) -> Self {
        let mut steps = self.0.clone();
        steps.push(pos);
        Self(steps)
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    /// Grid level addressed by this path; the root is level 1.
    #[must_use]
    pub fn level(&self) -> usize {
        self.0.len() + 1
    }

    #[must_use]
    pub fn as_slice(&self) -> &[CellPosition] {
        &self.0
    }
}

impl From<Vec<CellPosition>> for LayoutPath {
    fn from(value: Vec<CellPosition>) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NestedAction {
    Resize { rows: usize, columns: usize },
    Merge { from: CellPosition, to: CellPosition },
    Split { at: CellPosition },
    SetCell { at: CellPosition, content: CellContent },
    AddHeaderRow { text: String },
    SetHeaderRow { index: usize, text: String },
    RemoveHeaderRow { index: usize },
}

/// Applies `action` to the sub-grid at `path`, returning the next root layout.
pub fn reduce(
    layout: &NestedTableLayout,
    path: &LayoutPath,
    action: NestedAction,
) -> Result<NestedTableLayout, LayoutError> {
    let mut next = layout.clone();
    let grid = next.sublayout_mut(path.as_slice()).ok_or_else(|| {
        LayoutError::new(
            LayoutErrorCode::PathNotFound,
            format!("no nested table at path {:?}", path.as_slice()),
        )
    })?;
    match action {
        NestedAction::Resize { rows, columns } => resize(grid, rows, columns)?,
        NestedAction::Merge { from, to } => merge(grid, from, to)?,
        NestedAction::Split { at } => split(grid, at)?,
        NestedAction::SetCell { at, content } => set_cell(grid, path.level(), at, content)?,
        NestedAction::AddHeaderRow { text } => grid.header_rows.push(text),
        NestedAction::SetHeaderRow { index, text } => {
            let len = grid.header_rows.len();
            let slot = grid
                .header_rows
                .get_mut(index)
                .ok_or_else(|| LayoutError::out_of_bounds("header row", index, len))?;
            *slot = text;
        }
        NestedAction::RemoveHeaderRow { index } => {
            if index >= grid.header_rows.len() {
                return Err(LayoutError::out_of_bounds(
                    "header row",
                    index,
                    grid.header_rows.len(),
                ));
            }
            grid.header_rows.remove(index);
        }
    }
    Ok(next)
}

/// Coverage, id uniqueness and the depth cap, at every level.
pub fn check_coverage(layout: &NestedTableLayout) -> Result<(), LayoutError> {
    layout.validate().map_err(LayoutError::from)
}

fn check_position(grid: &NestedTableLayout, pos: CellPosition) -> Result<(), LayoutError> {
    if grid.in_bounds(pos) {
        Ok(())
    } else {
        Err(LayoutError::new(
            LayoutErrorCode::OutOfBounds,
            format!("position {pos} outside {}x{} grid", grid.rows, grid.columns),
        ))
    }
}

fn fresh_id(grid: &NestedTableLayout, pos: CellPosition) -> CellId {
    let id = CellId::for_position(pos.row_index, pos.column_index);
    if grid.cells.iter().any(|c| c.id == id) {
        CellId::generate()
    } else {
        id
    }
}

fn check_size(rows: usize, columns: usize) -> Result<(), LayoutError> {
    NestedTableLayout::check_dimensions(rows, columns)
        .map_err(|e| LayoutError::new(LayoutErrorCode::TooLarge, e.0))
}

// Callers keep `grid` within the size cap.
fn fill_uncovered(grid: &mut NestedTableLayout) {
    let mut covered = vec![false; grid.rows.saturating_mul(grid.columns)];
    for cell in &grid.cells {
        let Some(rect) = cell.rect().clip(grid.rows, grid.columns) else {
            continue;
        };
        for pos in rect.positions() {
            covered[pos.row_index * grid.columns + pos.column_index] = true;
        }
    }
    for (i, is_covered) in covered.into_iter().enumerate() {
        if !is_covered {
            let pos = CellPosition::new(i / grid.columns, i % grid.columns);
            let mut cell = NestedTableCell::empty(pos);
            cell.id = fresh_id(grid, pos);
            grid.cells.push(cell);
        }
    }
    grid.cells.sort_by_key(NestedTableCell::position);
}

fn resize(grid: &mut NestedTableLayout, rows: usize, columns: usize) -> Result<(), LayoutError> {
    if rows == 0 || columns == 0 {
        return Err(LayoutError::new(
            LayoutErrorCode::LastLine,
            "nested table must keep at least one row and one column",
        ));
    }
    check_size(rows, columns)?;
    grid.rows = rows;
    grid.columns = columns;
    grid.cells.retain(|c| c.row_index < rows && c.column_index < columns);
    for cell in &mut grid.cells {
        cell.row_span = cell.row_span.clamp(1, rows - cell.row_index);
        cell.col_span = cell.col_span.clamp(1, columns - cell.column_index);
    }
    fill_uncovered(grid);
    Ok(())
}

/// Grows `rect` until no cell straddles its border.
fn expand_to_cells(grid: &NestedTableLayout, mut rect: CellRect) -> CellRect {
    loop {
        let grown = grid
            .cells
            .iter()
            .map(NestedTableCell::rect)
            .filter(|r| r.intersects(&rect))
            .fold(rect, |acc, r| acc.union(&r));
        if grown == rect {
            return rect;
        }
        rect = grown;
    }
}

fn merge(grid: &mut NestedTableLayout, from: CellPosition, to: CellPosition) -> Result<(), LayoutError> {
    check_position(grid, from)?;
    check_position(grid, to)?;
    let rect = expand_to_cells(grid, CellRect::spanning(from, to));
    if rect.is_single() {
        return Ok(());
    }
    let anchor = rect.anchor();
    grid.cells
        .retain(|c| c.position() == anchor || !rect.contains(c.position()));
    let primary = grid.anchor_at_mut(anchor).ok_or_else(|| {
        LayoutError::new(
            LayoutErrorCode::Invalid,
            format!("position {anchor} has no anchored cell"),
        )
    })?;
    primary.row_span = rect.row_span();
    primary.col_span = rect.col_span();
    debug!(
        anchor = %anchor,
        row_span = rect.row_span(),
        col_span = rect.col_span(),
        "merged nested cells"
    );
    Ok(())
}

fn split(grid: &mut NestedTableLayout, at: CellPosition) -> Result<(), LayoutError> {
    check_size(grid.rows, grid.columns)?;
    check_position(grid, at)?;
    let rect = match grid.covering(at) {
        Some(cell) if cell.is_merged() => cell.rect(),
        _ => {
            return Err(LayoutError::new(
                LayoutErrorCode::NotMerged,
                format!("cell at {at} is not merged"),
            ))
        }
    };
    let anchor = rect.anchor();
    if let Some(primary) = grid.anchor_at_mut(anchor) {
        primary.row_span = 1;
        primary.col_span = 1;
    }
    fill_uncovered(grid);
    debug!(
        anchor = %anchor,
        freed = rect.row_span().saturating_mul(rect.col_span()) - 1,
        "split nested cell"
    );
    Ok(())
}

fn set_cell(
    grid: &mut NestedTableLayout,
    level: usize,
    at: CellPosition,
    content: CellContent,
) -> Result<(), LayoutError> {
    check_position(grid, at)?;
    if let CellContent::NestedTable { nested_table } = &content {
        if level + nested_table.depth() > MAX_NESTED_DEPTH {
            return Err(LayoutError::new(
                LayoutErrorCode::DepthExceeded,
                format!("nested tables may be at most {MAX_NESTED_DEPTH} levels deep"),
            ));
        }
        check_coverage(nested_table)?;
    }
    let cell = grid.anchor_at_mut(at).ok_or_else(|| {
        LayoutError::new(
            LayoutErrorCode::CoveredPosition,
            format!("position {at} is covered by a merged cell"),
        )
    })?;
    cell.content = content;
    Ok(())
}

/// Every input cell, depth-first in row-major order.
#[must_use]
pub fn nested_input_cells(layout: &NestedTableLayout, input_id: &InputId) -> Vec<InputCell> {
    let mut out = Vec::new();
    collect_inputs(layout, &CellKey::scalar(input_id.clone()), 1, &mut out);
    out
}

fn collect_inputs(
    layout: &NestedTableLayout,
    parent: &CellKey,
    level: usize,
    out: &mut Vec<InputCell>,
) {
    let mut cells: Vec<&NestedTableCell> = layout.cells.iter().collect();
    cells.sort_by_key(|c| c.position());
    for cell in cells {
        match &cell.content {
            CellContent::Input(input) => out.push(InputCell {
                key: parent.child(cell.position()),
                input_type: input.input_type,
                label: input.label.clone(),
                unit: input.unit.clone(),
                expectation: input.expectation,
            }),
            CellContent::NestedTable { nested_table } if level < MAX_NESTED_DEPTH => {
                collect_inputs(nested_table, &parent.child(cell.position()), level + 1, out);
            }
            _ => {}
        }
    }
}
