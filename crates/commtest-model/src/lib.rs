#![forbid(unsafe_code)]
//! Commissioning test data model: inputs, flat and nested table layouts,
//! responses and results.

mod definition;
mod expectation;
mod flat;
mod input;
mod nested;
mod position;
mod response;
mod result;

use std::fmt::{Display, Formatter};

pub use definition::{Asset, DefinitionSummary, Job, NewTest, TestDefinition};
pub use expectation::{
    decode_boolean_expectation, encode_boolean_expectation, ExpectedType, Expectation, ScalarType,
};
pub use flat::{TableCellConfig, TableLayoutConfig};
pub use input::{InputKind, InputType, LayoutKind, ScalarInput, TestInput, TestInputRecord};
pub use nested::{
    CellContent, CellInput, NestedTableCell, NestedTableLayout, MAX_GRID_LINES,
    MAX_NESTED_DEPTH,
};
pub use position::{CellPosition, CellRect};
pub use response::{ResponseValue, TestResultResponse};
pub use result::{ResultDraft, ResultStatus, TestResult};

pub const CRATE_NAME: &str = "commtest-model";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}
