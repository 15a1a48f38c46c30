// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::expectation::{Expectation, ScalarType};
use crate::position::CellPosition;
use crate::ValidationError;

/// Named-row/named-column grid where each cell is independently enabled and typed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableLayoutConfig {
    pub columns: Vec<String>,
    pub rows: Vec<String>,
    #[serde(default)]
    pub cells: Vec<TableCellConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header_rows: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCellConfig {
    pub row_index: usize,
    pub column_index: usize,
    pub enabled: bool,
    #[serde(default)]
    pub input_type: ScalarType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expectation: Option<Expectation>,
}

impl TableCellConfig {
    /// Configuration given to a position that has no entry yet.
    #[must_use]
    pub fn disabled(row_index: usize, column_index: usize) -> Self {
        Self {
            row_index,
            column_index,
            enabled: false,
            input_type: ScalarType::Number,
            label: None,
            unit: None,
            expectation: None,
        }
    }

    #[must_use]
    pub fn enabled(row_index: usize, column_index: usize, input_type: ScalarType) -> Self {
        Self {
            enabled: true,
            input_type,
            ..Self::disabled(row_index, column_index)
        }
    }

    #[must_use]
    pub const fn position(&self) -> CellPosition {
        CellPosition::new(self.row_index, self.column_index)
    }
}

impl TableLayoutConfig {
    /// Grid with every cell enabled as `input_type`.
    #[must_use]
    pub fn filled(rows: Vec<String>, columns: Vec<String>, input_type: ScalarType) -> Self {
        let mut cells = Vec::with_capacity(rows.len() * columns.len());
        for r in 0..rows.len() {
            for c in 0..columns.len() {
                cells.push(TableCellConfig::enabled(r, c, input_type));
            }
        }
        Self {
            columns,
            rows,
            cells,
            header_rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn cell(&self, pos: CellPosition) -> Option<&TableCellConfig> {
        self.cells.iter().find(|c| c.position() == pos)
    }

    #[must_use]
    pub fn cell_mut(&mut self, pos: CellPosition) -> Option<&mut TableCellConfig> {
        self.cells.iter_mut().find(|c| c.position() == pos)
    }

    /// The enabled cell at `pos`, if any. Absent and disabled positions are placeholders.
    #[must_use]
    pub fn enabled_cell(&self, pos: CellPosition) -> Option<&TableCellConfig> {
        self.cell(pos).filter(|c| c.enabled)
    }

    pub fn enabled_cells(&self) -> impl Iterator<Item = &TableCellConfig> {
        self.cells.iter().filter(|c| c.enabled)
    }

    #[must_use]
    pub fn in_bounds(&self, pos: CellPosition) -> bool {
        pos.row_index < self.rows.len() && pos.column_index < self.columns.len()
    }

    /// True when every (row, column) pair has exactly one entry and none lie outside.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        if self.cells.len() != self.rows.len() * self.columns.len() {
            return false;
        }
        let mut seen = BTreeSet::new();
        self.cells
            .iter()
            .all(|c| self.in_bounds(c.position()) && seen.insert(c.position()))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.rows.is_empty() || self.columns.is_empty() {
            return Err(ValidationError(
                "table layout must have at least one row and one column".to_string(),
            ));
        }
        let mut seen = BTreeSet::new();
        for cell in &self.cells {
            let pos = cell.position();
            if !self.in_bounds(pos) {
                return Err(ValidationError(format!(
                    "table cell {pos} lies outside {}x{} grid",
                    self.rows.len(),
                    self.columns.len()
                )));
            }
            if !seen.insert(pos) {
                return Err(ValidationError(format!("duplicate table cell at {pos}")));
            }
        }
        Ok(())
    }
}
