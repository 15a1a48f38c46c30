// SPDX-License-Identifier: Apache-2.0

use commtest_core::CellId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::expectation::{Expectation, ScalarType};
use crate::position::{CellPosition, CellRect};
use crate::ValidationError;

/// Grid levels allowed in one nested layout, the root included.
pub const MAX_NESTED_DEPTH: usize = 4;

/// Rows or columns allowed in one grid level.
pub const MAX_GRID_LINES: usize = 64;

/// Recursive grid addressed by integer position, with merged cells and
/// embedded sub-tables.
///
/// Every position in `[0, rows) x [0, columns)` is covered by exactly one
/// cell: either a singleton anchored there or a spanning cell anchored
/// above-left of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedTableLayout {
    pub rows: usize,
    pub columns: usize,
    #[serde(default)]
    pub cells: Vec<NestedTableCell>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header_rows: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedTableCell {
    pub id: CellId,
    pub row_index: usize,
    pub column_index: usize,
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub row_span: usize,
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub col_span: usize,
    #[serde(flatten)]
    pub content: CellContent,
}

const fn one() -> usize {
    1
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_one(v: &usize) -> bool {
    *v == 1
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "cellType", rename_all = "snake_case")]
pub enum CellContent {
    #[default]
    Empty,
    #[serde(rename_all = "camelCase")]
    Header { header_text: String },
    Input(CellInput),
    #[serde(rename_all = "camelCase")]
    NestedTable { nested_table: Box<NestedTableLayout> },
}

impl CellContent {
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Header { .. } => "header",
            Self::Input(_) => "input",
            Self::NestedTable { .. } => "nested_table",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellInput {
    #[serde(default)]
    pub input_type: ScalarType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expectation: Option<Expectation>,
}

impl CellInput {
    #[must_use]
    pub fn of_type(input_type: ScalarType) -> Self {
        Self {
            input_type,
            ..Self::default()
        }
    }
}

impl NestedTableCell {
    #[must_use]
    pub fn empty(pos: CellPosition) -> Self {
        Self {
            id: CellId::for_position(pos.row_index, pos.column_index),
            row_index: pos.row_index,
            column_index: pos.column_index,
            row_span: 1,
            col_span: 1,
            content: CellContent::Empty,
        }
    }

    #[must_use]
    pub const fn position(&self) -> CellPosition {
        CellPosition::new(self.row_index, self.column_index)
    }

    #[must_use]
    pub fn rect(&self) -> CellRect {
        CellRect::from_anchor(self.position(), self.row_span, self.col_span)
    }

    /// Covered rectangle, or `None` when the span runs past `usize::MAX`.
    #[must_use]
    pub fn checked_rect(&self) -> Option<CellRect> {
        CellRect::checked_from_anchor(self.position(), self.row_span, self.col_span)
    }

    #[must_use]
    pub const fn is_merged(&self) -> bool {
        self.row_span > 1 || self.col_span > 1
    }
}

impl NestedTableLayout {
    /// `rows x columns` grid of singleton empty cells.
    #[must_use]
    pub fn new(rows: usize, columns: usize) -> Self {
        let mut cells = Vec::with_capacity(rows.saturating_mul(columns));
        for r in 0..rows {
            for c in 0..columns {
                cells.push(NestedTableCell::empty(CellPosition::new(r, c)));
            }
        }
        Self {
            rows,
            columns,
            cells,
            header_rows: Vec::new(),
        }
    }

    #[must_use]
    pub const fn in_bounds(&self, pos: CellPosition) -> bool {
        pos.row_index < self.rows && pos.column_index < self.columns
    }

    /// Cell anchored exactly at `pos`.
    #[must_use]
    pub fn anchor_at(&self, pos: CellPosition) -> Option<&NestedTableCell> {
        self.cells.iter().find(|c| c.position() == pos)
    }

    #[must_use]
    pub fn anchor_at_mut(&mut self, pos: CellPosition) -> Option<&mut NestedTableCell> {
        self.cells.iter_mut().find(|c| c.position() == pos)
    }

    /// Cell whose rectangle contains `pos`, whether anchored there or not.
    #[must_use]
    pub fn covering(&self, pos: CellPosition) -> Option<&NestedTableCell> {
        self.cells.iter().find(|c| c.rect().contains(pos))
    }

    /// True when `pos` is inside a merged cell anchored elsewhere.
    #[must_use]
    pub fn is_covered_not_anchored(&self, pos: CellPosition) -> bool {
        self.covering(pos).is_some_and(|c| c.position() != pos)
    }

    /// Walks `path` through nested-table cells; an empty path is `self`.
    #[must_use]
    pub fn sublayout(&self, path: &[CellPosition]) -> Option<&Self> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        match &self.anchor_at(*first)?.content {
            CellContent::NestedTable { nested_table } => nested_table.sublayout(rest),
            _ => None,
        }
    }

    #[must_use]
    pub fn sublayout_mut(&mut self, path: &[CellPosition]) -> Option<&mut Self> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        match &mut self.anchor_at_mut(*first)?.content {
            CellContent::NestedTable { nested_table } => nested_table.sublayout_mut(rest),
            _ => None,
        }
    }

    /// Number of grid levels, this one included.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self
            .cells
            .iter()
            .filter_map(|c| match &c.content {
                CellContent::NestedTable { nested_table } => Some(nested_table.depth()),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Rejects grids with more than [`MAX_GRID_LINES`] rows or columns.
    pub fn check_dimensions(rows: usize, columns: usize) -> Result<(), ValidationError> {
        if rows > MAX_GRID_LINES || columns > MAX_GRID_LINES {
            return Err(ValidationError(format!(
                "nested table is {rows}x{columns}; at most {MAX_GRID_LINES} rows and columns are allowed"
            )));
        }
        Ok(())
    }

    /// Row-major map from position to the index of its covering cell.
    pub fn coverage(&self) -> Result<Vec<usize>, ValidationError> {
        Self::check_dimensions(self.rows, self.columns)?;
        let size = self.rows.checked_mul(self.columns).ok_or_else(|| {
            ValidationError(format!("nested table {}x{} is too large", self.rows, self.columns))
        })?;
        let mut grid: Vec<Option<usize>> = vec![None; size];
        for (idx, cell) in self.cells.iter().enumerate() {
            if cell.row_span == 0 || cell.col_span == 0 {
                return Err(ValidationError(format!(
                    "cell {} has a zero span",
                    cell.id
                )));
            }
            let rect = cell.checked_rect().ok_or_else(|| {
                ValidationError(format!("cell {} has a span past the addressable grid", cell.id))
            })?;
            if rect.bottom >= self.rows || rect.right >= self.columns {
                return Err(ValidationError(format!(
                    "cell {} at {} extends outside {}x{} grid",
                    cell.id,
                    cell.position(),
                    self.rows,
                    self.columns
                )));
            }
            for pos in rect.positions() {
                let slot = &mut grid[pos.row_index * self.columns + pos.column_index];
                if let Some(other) = slot {
                    return Err(ValidationError(format!(
                        "position {pos} covered by both {} and {}",
                        self.cells[*other].id, cell.id
                    )));
                }
                *slot = Some(idx);
            }
        }
        grid.into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| {
                    ValidationError(format!(
                        "position {} is not covered by any cell",
                        CellPosition::new(i / self.columns, i % self.columns)
                    ))
                })
            })
            .collect()
    }

    /// Coverage, unique ids and the depth cap, checked at every level.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_at_level(1)
    }

    fn validate_at_level(&self, level: usize) -> Result<(), ValidationError> {
        if level > MAX_NESTED_DEPTH {
            return Err(ValidationError(format!(
                "nested tables may be at most {MAX_NESTED_DEPTH} levels deep"
            )));
        }
        if self.rows == 0 || self.columns == 0 {
            return Err(ValidationError(
                "nested table must have at least one row and one column".to_string(),
            ));
        }
        Self::check_dimensions(self.rows, self.columns)?;
        self.coverage()?;
        let mut ids = BTreeSet::new();
        for cell in &self.cells {
            if !ids.insert(&cell.id) {
                return Err(ValidationError(format!("duplicate cell id {}", cell.id)));
            }
            if let CellContent::NestedTable { nested_table } = &cell.content {
                nested_table.validate_at_level(level + 1)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_grid_is_fully_covered() {
        let layout = NestedTableLayout::new(3, 2);
        assert_eq!(layout.coverage().expect("coverage").len(), 6);
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn overlap_is_reported() {
        let mut layout = NestedTableLayout::new(2, 2);
        layout.cells[0].col_span = 2;
        let err = layout.coverage().expect_err("overlap");
        assert!(err.0.contains("covered by both"));
    }

    #[test]
    fn gap_is_reported() {
        let mut layout = NestedTableLayout::new(2, 2);
        layout.cells.pop();
        let err = layout.coverage().expect_err("gap");
        assert!(err.0.contains("(1, 1)"));
    }

    #[test]
    fn oversized_grid_is_rejected_before_allocation() {
        let layout = NestedTableLayout {
            rows: usize::MAX,
            columns: usize::MAX,
            cells: Vec::new(),
            header_rows: Vec::new(),
        };
        let err = layout.validate().expect_err("too large");
        assert!(err.0.contains("at most 64"));
    }

    #[test]
    fn span_overflow_is_a_validation_error() {
        let mut layout = NestedTableLayout::new(3, 2);
        layout.cells[4].row_span = usize::MAX;
        let err = layout.coverage().expect_err("overflow");
        assert!(err.0.contains("past the addressable grid"));
    }

    #[test]
    fn depth_counts_levels() {
        let mut root = NestedTableLayout::new(1, 1);
        root.cells[0].content = CellContent::NestedTable {
            nested_table: Box::new(NestedTableLayout::new(1, 1)),
        };
        assert_eq!(root.depth(), 2);
    }
}
