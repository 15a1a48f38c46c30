// SPDX-License-Identifier: Apache-2.0

use commtest_layout::RawValue;
use commtest_model::{decode_boolean_expectation, ExpectedType, Expectation, ScalarType};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail,
}

/// Advisory pass/fail annotation for one field. Never blocks submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub outcome: Outcome,
    pub message: String,
}

impl Verdict {
    fn pass(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Pass,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Fail,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Pass)
    }
}

fn with_unit(text: String, unit: Option<&str>) -> String {
    match unit.map(str::trim).filter(|u| !u.is_empty()) {
        Some(unit) => format!("{text} {unit}"),
        None => text,
    }
}

fn bounds_text(min: Option<f64>, max: Option<f64>, unit: Option<&str>) -> Option<String> {
    let text = match (min, max) {
        (Some(lo), Some(hi)) => format!("{lo} – {hi}"),
        (Some(lo), None) => format!("≥ {lo}"),
        (None, Some(hi)) => format!("≤ {hi}"),
        (None, None) => return None,
    };
    Some(with_unit(text, unit))
}

/// `None` when the value is absent or unparseable, when the type carries no
/// rule (text), or when the expectation lacks the bound its type needs.
#[must_use]
pub fn evaluate(
    expectation: &Expectation,
    value_type: ScalarType,
    unit: Option<&str>,
    raw: &RawValue,
) -> Option<Verdict> {
    if raw.is_blank() {
        return None;
    }
    match value_type {
        ScalarType::Text => None,
        ScalarType::Boolean => evaluate_boolean(expectation, raw),
        ScalarType::Number => evaluate_number(expectation, unit, raw.as_number()?),
    }
}

fn evaluate_boolean(expectation: &Expectation, raw: &RawValue) -> Option<Verdict> {
    if expectation.expected_type != ExpectedType::Exact {
        return None;
    }
    let expected = decode_boolean_expectation(expectation.expected_value?);
    let actual = raw.as_bool()?;
    if actual == expected {
        Some(Verdict::pass("Pass"))
    } else {
        Some(Verdict::fail(if expected {
            "Expected Yes"
        } else {
            "Expected No"
        }))
    }
}

fn evaluate_number(expectation: &Expectation, unit: Option<&str>, value: f64) -> Option<Verdict> {
    match expectation.expected_type {
        ExpectedType::Range => {
            let (min, max) = (expectation.expected_min, expectation.expected_max);
            let bounds = bounds_text(min, max, unit)?;
            let above = min.map_or(true, |lo| value >= lo);
            let below = max.map_or(true, |hi| value <= hi);
            if above && below {
                Some(Verdict::pass(format!("Within range ({bounds})")))
            } else {
                Some(Verdict::fail(format!("Expected {bounds}")))
            }
        }
        ExpectedType::Minimum => {
            let min = expectation.expected_min?;
            if value >= min {
                Some(Verdict::pass("Pass"))
            } else {
                Some(Verdict::fail(format!(
                    "Expected {}",
                    with_unit(format!("≥ {min}"), unit)
                )))
            }
        }
        ExpectedType::Maximum => {
            let max = expectation.expected_max?;
            if value <= max {
                Some(Verdict::pass("Pass"))
            } else {
                Some(Verdict::fail(format!(
                    "Expected {}",
                    with_unit(format!("≤ {max}"), unit)
                )))
            }
        }
        ExpectedType::Exact => {
            let expected = expectation.expected_value?;
            #[allow(clippy::float_cmp)]
            let equal = value == expected;
            if equal {
                Some(Verdict::pass("Pass"))
            } else {
                Some(Verdict::fail(format!(
                    "Expected {}",
                    with_unit(expected.to_string(), unit)
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_numbers_print_without_fraction() {
        assert_eq!(
            bounds_text(Some(10.0), Some(20.5), Some("V")).as_deref(),
            Some("10 – 20.5 V")
        );
        assert_eq!(bounds_text(None, None, None), None);
    }
}
