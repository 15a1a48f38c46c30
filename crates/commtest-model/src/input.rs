// SPDX-License-Identifier: Apache-2.0

use commtest_core::InputId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::expectation::{ExpectedType, Expectation, ScalarType};
use crate::flat::TableLayoutConfig;
use crate::nested::NestedTableLayout;

/// Wire discriminator of a test input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    Number,
    Text,
    Boolean,
    Table,
    NestedTable,
}

impl InputType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Table => "table",
            Self::NestedTable => "nested_table",
        }
    }
}

impl Display for InputType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ScalarType> for InputType {
    fn from(value: ScalarType) -> Self {
        match value {
            ScalarType::Number => Self::Number,
            ScalarType::Text => Self::Text,
            ScalarType::Boolean => Self::Boolean,
        }
    }
}

/// Which table layout a table-typed input expected but did not carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    Table,
    NestedTable,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScalarInput {
    pub value_type: ScalarType,
    pub unit: Option<String>,
    pub expectation: Expectation,
}

/// Semantics of one input. Exactly one shape is carried, chosen by the wire `input_type`.
#[derive(Debug, Clone, PartialEq)]
pub enum InputKind {
    Scalar(ScalarInput),
    Table(TableLayoutConfig),
    NestedTable(NestedTableLayout),
    /// Table-typed input persisted without its layout; renders as a placeholder.
    MissingLayout(LayoutKind),
}

impl InputKind {
    #[must_use]
    pub const fn input_type(&self) -> InputType {
        match self {
            Self::Scalar(s) => match s.value_type {
                ScalarType::Number => InputType::Number,
                ScalarType::Text => InputType::Text,
                ScalarType::Boolean => InputType::Boolean,
            },
            Self::Table(_) | Self::MissingLayout(LayoutKind::Table) => InputType::Table,
            Self::NestedTable(_) | Self::MissingLayout(LayoutKind::NestedTable) => {
                InputType::NestedTable
            }
        }
    }
}

/// One declared measurement or field within a test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TestInputRecord", into = "TestInputRecord")]
pub struct TestInput {
    pub id: InputId,
    pub label: String,
    pub position: u32,
    pub notes: Option<String>,
    pub kind: InputKind,
}

impl TestInput {
    #[must_use]
    pub fn scalar(id: InputId, label: &str, position: u32, scalar: ScalarInput) -> Self {
        Self {
            id,
            label: label.to_string(),
            position,
            notes: None,
            kind: InputKind::Scalar(scalar),
        }
    }

    #[must_use]
    pub const fn input_type(&self) -> InputType {
        self.kind.input_type()
    }

    #[must_use]
    pub const fn is_table(&self) -> bool {
        !matches!(self.kind, InputKind::Scalar(_))
    }
}

/// Row shape exchanged with the hosted backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestInputRecord {
    pub id: InputId,
    pub label: String,
    pub input_type: InputType,
    #[serde(default)]
    pub position: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_type: Option<ExpectedType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_layout: Option<TableLayoutConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_table_layout: Option<NestedTableLayout>,
}

impl From<TestInputRecord> for TestInput {
    fn from(record: TestInputRecord) -> Self {
        let scalar = |value_type: ScalarType| {
            InputKind::Scalar(ScalarInput {
                value_type,
                unit: record.unit.clone(),
                expectation: Expectation {
                    expected_type: record.expected_type.unwrap_or_default(),
                    expected_min: record.expected_min,
                    expected_max: record.expected_max,
                    expected_value: record.expected_value,
                },
            })
        };
        let kind = match record.input_type {
            InputType::Number => scalar(ScalarType::Number),
            InputType::Text => scalar(ScalarType::Text),
            InputType::Boolean => scalar(ScalarType::Boolean),
            InputType::Table => match record.table_layout {
                Some(layout) => InputKind::Table(layout),
                None => InputKind::MissingLayout(LayoutKind::Table),
            },
            InputType::NestedTable => match record.nested_table_layout {
                Some(layout) => InputKind::NestedTable(layout),
                None => InputKind::MissingLayout(LayoutKind::NestedTable),
            },
        };
        Self {
            id: record.id,
            label: record.label,
            position: record.position,
            notes: record.notes,
            kind,
        }
    }
}

impl From<TestInput> for TestInputRecord {
    fn from(input: TestInput) -> Self {
        let input_type = input.input_type();
        let mut record = Self {
            id: input.id,
            label: input.label,
            input_type,
            position: input.position,
            unit: None,
            expected_type: None,
            expected_min: None,
            expected_max: None,
            expected_value: None,
            notes: input.notes,
            table_layout: None,
            nested_table_layout: None,
        };
        match input.kind {
            InputKind::Scalar(s) => {
                record.unit = s.unit;
                record.expected_type = Some(s.expectation.expected_type);
                record.expected_min = s.expectation.expected_min;
                record.expected_max = s.expectation.expected_max;
                record.expected_value = s.expectation.expected_value;
            }
            InputKind::Table(layout) => record.table_layout = Some(layout),
            InputKind::NestedTable(layout) => record.nested_table_layout = Some(layout),
            InputKind::MissingLayout(_) => {}
        }
        record
    }
}
