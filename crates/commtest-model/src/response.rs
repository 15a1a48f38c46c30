use commtest_core::InputId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::position::CellPosition;

/// Captured value of a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl ResponseValue {
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl Display for ResponseValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(t) => f.write_str(t),
        }
    }
}

/// One saved answer. Table-derived responses reference the containing table
/// input and carry the top-level cell position; cells of embedded sub-tables
/// add the remaining levels in `nested_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultResponse {
    pub input_id: InputId,
    pub value: Option<ResponseValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_cell_position: Option<CellPosition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested_path: Vec<CellPosition>,
}

impl TestResultResponse {
    #[must_use]
    pub fn scalar(input_id: InputId, value: Option<ResponseValue>) -> Self {
        Self {
            input_id,
            value,
            notes: None,
            table_cell_position: None,
            nested_path: Vec::new(),
        }
    }

    /// Full cell path from the outermost grid inward; empty for scalar responses.
    #[must_use]
    pub fn cell_path(&self) -> Vec<CellPosition> {
        match self.table_cell_position {
            Some(first) => std::iter::once(first)
                .chain(self.nested_path.iter().copied())
                .collect(),
            None => Vec::new(),
        }
    }
}
