// SPDX-License-Identifier: Apache-2.0

use commtest_core::InputId;
use commtest_model::{CellPosition, Expectation, ResponseValue, ScalarType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::{LayoutError, LayoutErrorCode};

/// Address of one editable field: an input, plus the chain of cell
/// positions from the outermost grid inward when the field is a table cell.
/// Scalar inputs have an empty path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub input_id: InputId,
    pub path: Vec<CellPosition>,
}

impl CellKey {
    #[must_use]
    pub fn scalar(input_id: InputId) -> Self {
        Self {
            input_id,
            path: Vec::new(),
        }
    }

    #[must_use]
    pub fn cell(input_id: InputId, pos: CellPosition) -> Self {
        Self {
            input_id,
            path: vec![pos],
        }
    }

    /// Key of `pos` one grid level below this key.
    #[must_use]
    pub fn child(&self, pos: CellPosition) -> Self {
        let mut path = self.path.clone();
        path.push(pos);
        Self {
            input_id: self.input_id.clone(),
            path,
        }
    }

    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.path.is_empty()
    }

    #[must_use]
    pub fn top_cell(&self) -> Option<CellPosition> {
        self.path.first().copied()
    }

    /// Unambiguous text form, `input:row.col` per level (`grid:0.1:2.0`).
    /// Parsed back by `FromStr`.
    #[must_use]
    pub fn qualified(&self) -> String {
        let mut out = self.input_id.to_string();
        for pos in &self.path {
            out.push_str(&format!(":{}.{}", pos.row_index, pos.column_index));
        }
        out
    }
}

impl FromStr for CellKey {
    type Err = LayoutError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = |why: String| LayoutError::new(LayoutErrorCode::Invalid, why);
        let mut parts = raw.split(':');
        let input = parts.next().unwrap_or_default();
        let input_id = InputId::new(input).map_err(|e| invalid(e.to_string()))?;
        let mut path = Vec::new();
        for step in parts {
            let (row, column) = step
                .split_once('.')
                .ok_or_else(|| invalid(format!("cell step {step:?} must be row.col")))?;
            let row = row
                .parse()
                .map_err(|_| invalid(format!("bad row index {row:?} in {raw:?}")))?;
            let column = column
                .parse()
                .map_err(|_| invalid(format!("bad column index {column:?} in {raw:?}")))?;
            path.push(CellPosition::new(row, column));
        }
        Ok(Self { input_id, path })
    }
}

impl Display for CellKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.input_id)?;
        for pos in &self.path {
            write!(f, "_{}_{}", pos.row_index, pos.column_index)?;
        }
        Ok(())
    }
}

/// Raw field state as entered: free text or a checkbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Boolean(bool),
    Text(String),
}

impl RawValue {
    #[must_use]
    pub fn text(value: &str) -> Self {
        Self::Text(value.to_string())
    }

    /// Blank text counts as absent.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Boolean(_) => false,
            Self::Text(t) => t.trim().is_empty(),
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Text(t) => t.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Self::Boolean(_) => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            Self::Text(t) => match t.trim() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
        }
    }

    /// Editable form of a persisted value.
    #[must_use]
    pub fn from_response(value: &ResponseValue) -> Self {
        match value {
            ResponseValue::Boolean(b) => Self::Boolean(*b),
            ResponseValue::Number(n) => Self::Text(n.to_string()),
            ResponseValue::Text(t) => Self::Text(t.clone()),
        }
    }

    /// Typed value for persistence; `None` for blank or unparseable input.
    #[must_use]
    pub fn to_response(&self, value_type: ScalarType) -> Option<ResponseValue> {
        if self.is_blank() {
            return None;
        }
        match value_type {
            ScalarType::Number => self.as_number().map(ResponseValue::Number),
            ScalarType::Boolean => self.as_bool().map(ResponseValue::Boolean),
            ScalarType::Text => match self {
                Self::Text(t) => Some(ResponseValue::Text(t.clone())),
                Self::Boolean(b) => Some(ResponseValue::Text(b.to_string())),
            },
        }
    }
}

pub type ValueMap = BTreeMap<CellKey, RawValue>;
pub type FieldErrors = BTreeMap<CellKey, String>;

/// An enabled input cell of a table layout, with its configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct InputCell {
    pub key: CellKey,
    pub input_type: ScalarType,
    pub label: Option<String>,
    pub unit: Option<String>,
    pub expectation: Option<Expectation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> InputId {
        InputId::new("grid").expect("id")
    }

    #[test]
    fn display_matches_legacy_string_keys() {
        let key = CellKey::cell(input(), CellPosition::new(1, 2)).child(CellPosition::new(0, 3));
        assert_eq!(key.to_string(), "grid_1_2_0_3");
        assert_eq!(CellKey::scalar(input()).to_string(), "grid");
    }

    #[test]
    fn qualified_form_separates_ids_that_look_like_cells() {
        let scalar = CellKey::scalar(InputId::new("a_1_2").expect("id"));
        let cell = CellKey::cell(InputId::new("a").expect("id"), CellPosition::new(1, 2));
        assert_eq!(scalar.to_string(), cell.to_string());
        assert_eq!(scalar.qualified(), "a_1_2");
        assert_eq!(cell.qualified(), "a:1.2");
        assert_eq!("a_1_2".parse::<CellKey>().expect("scalar"), scalar);
        assert_eq!("a:1.2".parse::<CellKey>().expect("cell"), cell);
    }

    #[test]
    fn qualified_form_parses_nested_paths_and_rejects_junk() {
        let key = CellKey::cell(input(), CellPosition::new(1, 2)).child(CellPosition::new(0, 3));
        assert_eq!(key.qualified().parse::<CellKey>().expect("nested"), key);
        assert!("grid:1".parse::<CellKey>().is_err());
        assert!("grid:x.0".parse::<CellKey>().is_err());
        assert!("Grid".parse::<CellKey>().is_err());
    }

    #[test]
    fn numbers_round_trip_through_raw_text() {
        let raw = RawValue::from_response(&ResponseValue::Number(3.3));
        assert_eq!(raw, RawValue::text("3.3"));
        assert_eq!(
            raw.to_response(ScalarType::Number),
            Some(ResponseValue::Number(3.3))
        );
    }

    #[test]
    fn blank_and_garbage_are_not_values() {
        assert_eq!(RawValue::text("  ").to_response(ScalarType::Text), None);
        assert_eq!(RawValue::text("abc").to_response(ScalarType::Number), None);
        assert_eq!(RawValue::text("inf").as_number(), None);
    }
}
