use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Value type of a single captured field (scalar input or table cell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    #[default]
    Number,
    Text,
    Boolean,
}

impl ScalarType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Text => "text",
            Self::Boolean => "boolean",
        }
    }
}

impl Display for ScalarType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedType {
    #[default]
    Range,
    Minimum,
    Maximum,
    Exact,
}

impl ExpectedType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Range => "range",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::Exact => "exact",
        }
    }
}

impl Display for ExpectedType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared pass/fail rule. Bounds stay optional: an expectation missing the
/// bound its type needs simply yields no verdict.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Expectation {
    #[serde(default)]
    pub expected_type: ExpectedType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<f64>,
}

impl Expectation {
    #[must_use]
    pub fn range(min: f64, max: f64) -> Self {
        Self {
            expected_type: ExpectedType::Range,
            expected_min: Some(min),
            expected_max: Some(max),
            expected_value: None,
        }
    }

    #[must_use]
    pub fn minimum(min: f64) -> Self {
        Self {
            expected_type: ExpectedType::Minimum,
            expected_min: Some(min),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn maximum(max: f64) -> Self {
        Self {
            expected_type: ExpectedType::Maximum,
            expected_max: Some(max),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn exact(value: f64) -> Self {
        Self {
            expected_type: ExpectedType::Exact,
            expected_value: Some(value),
            ..Self::default()
        }
    }

    /// True when any bound is configured.
    #[must_use]
    pub fn has_bounds(&self) -> bool {
        self.expected_min.is_some() || self.expected_max.is_some() || self.expected_value.is_some()
    }
}

/// Booleans are stored as a numeric expected value: 1 is true, 0 is false.
#[must_use]
pub fn decode_boolean_expectation(value: f64) -> bool {
    value != 0.0
}

#[must_use]
pub const fn encode_boolean_expectation(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}
