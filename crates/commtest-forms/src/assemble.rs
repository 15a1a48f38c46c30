// SPDX-License-Identifier: Apache-2.0

use commtest_core::{AssetId, InputId, JobId};
use commtest_layout::{flat, nested};
use commtest_model::{
    ExpectedType, Expectation, InputKind, InputType, LayoutKind, NestedTableLayout, NewTest,
    ScalarInput, ScalarType, TableLayoutConfig, TestDefinition, TestInput,
};
use commtest_store::{StoreError, TestBackend};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use tracing::{info, warn};

/// Authoring form state for a new test.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub job_id: Option<JobId>,
    #[serde(default)]
    pub asset_id: Option<AssetId>,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub inputs: Vec<InputDraft>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputDraft {
    pub label: String,
    pub input_type: InputType,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub expected_type: ExpectedType,
    #[serde(default)]
    pub expected_min: Option<f64>,
    #[serde(default)]
    pub expected_max: Option<f64>,
    #[serde(default)]
    pub expected_value: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub table_layout: Option<TableLayoutConfig>,
    #[serde(default)]
    pub nested_table_layout: Option<NestedTableLayout>,
}

impl InputDraft {
    #[must_use]
    pub fn scalar(label: &str, value_type: ScalarType, expectation: Expectation) -> Self {
        Self {
            label: label.to_string(),
            input_type: value_type.into(),
            unit: None,
            expected_type: expectation.expected_type,
            expected_min: expectation.expected_min,
            expected_max: expectation.expected_max,
            expected_value: expectation.expected_value,
            notes: None,
            table_layout: None,
            nested_table_layout: None,
        }
    }

    #[must_use]
    pub fn table(label: &str, layout: TableLayoutConfig) -> Self {
        Self {
            table_layout: Some(layout),
            ..Self::scalar(label, ScalarType::Number, Expectation::default())
        }
        .with_type(InputType::Table)
    }

    #[must_use]
    pub fn nested_table(label: &str, layout: NestedTableLayout) -> Self {
        Self {
            nested_table_layout: Some(layout),
            ..Self::scalar(label, ScalarType::Number, Expectation::default())
        }
        .with_type(InputType::NestedTable)
    }

    #[must_use]
    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    fn with_type(mut self, input_type: InputType) -> Self {
        self.input_type = input_type;
        self
    }

    const fn scalar_type(&self) -> Option<ScalarType> {
        match self.input_type {
            InputType::Number => Some(ScalarType::Number),
            InputType::Text => Some(ScalarType::Text),
            InputType::Boolean => Some(ScalarType::Boolean),
            InputType::Table | InputType::NestedTable => None,
        }
    }

    fn expectation(&self) -> Expectation {
        Expectation {
            expected_type: self.expected_type,
            expected_min: self.expected_min,
            expected_max: self.expected_max,
            expected_value: self.expected_value,
        }
    }
}

/// Values fixed by where the form was opened from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthoringContext {
    pub locked_job: Option<JobId>,
    pub locked_asset: Option<AssetId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "field", content = "input", rename_all = "snake_case")]
pub enum DraftField {
    Name,
    Job,
    InputLabel(usize),
    InputMin(usize),
    InputMax(usize),
    InputValue(usize),
    InputLayout(usize),
}

impl Display for DraftField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name => f.write_str("name"),
            Self::Job => f.write_str("job_id"),
            Self::InputLabel(i) => write!(f, "inputs[{i}].label"),
            Self::InputMin(i) => write!(f, "inputs[{i}].expected_min"),
            Self::InputMax(i) => write!(f, "inputs[{i}].expected_max"),
            Self::InputValue(i) => write!(f, "inputs[{i}].expected_value"),
            Self::InputLayout(i) => write!(f, "inputs[{i}].layout"),
        }
    }
}

pub type DraftErrors = BTreeMap<DraftField, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
    Invalid(DraftErrors),
    Backend(StoreError),
}

impl Display for AssembleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(errors) => write!(f, "test draft has {} invalid field(s)", errors.len()),
            Self::Backend(err) => write!(f, "test creation failed: {err}"),
        }
    }
}

impl std::error::Error for AssembleError {}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Checks every field and reports all problems at once.
pub fn validate_draft(draft: &TestDraft, ctx: &AuthoringContext) -> Result<(), DraftErrors> {
    let mut errors = DraftErrors::new();
    if draft.name.trim().is_empty() {
        errors.insert(DraftField::Name, "Enter a test name".to_string());
    }
    if ctx.locked_job.is_none() && draft.job_id.is_none() {
        errors.insert(DraftField::Job, "Select a job".to_string());
    }
    for (i, input) in draft.inputs.iter().enumerate() {
        if input.label.trim().is_empty() {
            errors.insert(DraftField::InputLabel(i), "Enter a label".to_string());
        }
        match input.input_type {
            InputType::Boolean => {}
            InputType::Number | InputType::Text => {
                check_bounds(i, input, &mut errors);
            }
            InputType::Table => match &input.table_layout {
                Some(layout) => {
                    if let Err(err) = layout.validate() {
                        errors.insert(DraftField::InputLayout(i), err.0);
                    }
                }
                None => {
                    errors.insert(
                        DraftField::InputLayout(i),
                        "Configure the table layout".to_string(),
                    );
                }
            },
            InputType::NestedTable => match &input.nested_table_layout {
                Some(layout) => {
                    if let Err(err) = nested::check_coverage(layout) {
                        errors.insert(DraftField::InputLayout(i), err.message);
                    }
                }
                None => {
                    errors.insert(
                        DraftField::InputLayout(i),
                        "Configure the table layout".to_string(),
                    );
                }
            },
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_bounds(i: usize, input: &InputDraft, errors: &mut DraftErrors) {
    let need_min = matches!(input.expected_type, ExpectedType::Range | ExpectedType::Minimum);
    let need_max = matches!(input.expected_type, ExpectedType::Range | ExpectedType::Maximum);
    let need_value =
        input.expected_type == ExpectedType::Exact && input.input_type != InputType::Text;
    if need_min && input.expected_min.is_none() {
        errors.insert(DraftField::InputMin(i), "Enter a minimum value".to_string());
    }
    if need_max && input.expected_max.is_none() {
        errors.insert(DraftField::InputMax(i), "Enter a maximum value".to_string());
    }
    if need_value && input.expected_value.is_none() {
        errors.insert(DraftField::InputValue(i), "Enter an expected value".to_string());
    }
}

fn input_kind(input: &InputDraft) -> InputKind {
    if let Some(value_type) = input.scalar_type() {
        return InputKind::Scalar(ScalarInput {
            value_type,
            unit: non_blank(input.unit.as_deref()),
            expectation: input.expectation(),
        });
    }
    match input.input_type {
        InputType::Table => input.table_layout.as_ref().map_or(
            InputKind::MissingLayout(LayoutKind::Table),
            |layout| InputKind::Table(flat::reconcile(layout).into_owned()),
        ),
        _ => input.nested_table_layout.clone().map_or(
            InputKind::MissingLayout(LayoutKind::NestedTable),
            InputKind::NestedTable,
        ),
    }
}

/// Validates `draft` and builds the creation payload. Inputs are ordered as drafted.
pub fn assemble(draft: &TestDraft, ctx: &AuthoringContext) -> Result<NewTest, AssembleError> {
    validate_draft(draft, ctx).map_err(AssembleError::Invalid)?;
    let job_id = ctx
        .locked_job
        .clone()
        .or_else(|| draft.job_id.clone())
        .ok_or_else(|| {
            AssembleError::Invalid(DraftErrors::from([(
                DraftField::Job,
                "Select a job".to_string(),
            )]))
        })?;
    let inputs = draft
        .inputs
        .iter()
        .enumerate()
        .map(|(i, input)| TestInput {
            id: InputId::generate(),
            label: input.label.trim().to_string(),
            position: u32::try_from(i).unwrap_or(u32::MAX),
            notes: non_blank(input.notes.as_deref()),
            kind: input_kind(input),
        })
        .collect();
    Ok(NewTest {
        name: draft.name.trim().to_string(),
        description: non_blank(draft.description.as_deref()),
        instructions: non_blank(draft.instructions.as_deref()),
        job_id,
        asset_id: ctx.locked_asset.clone().or_else(|| draft.asset_id.clone()),
        asset_type: non_blank(draft.asset_type.as_deref()),
        inputs,
    })
}

/// Assembles and persists a test. Failures are returned, never retried.
pub async fn create_test(
    backend: &dyn TestBackend,
    draft: &TestDraft,
    ctx: &AuthoringContext,
) -> Result<TestDefinition, AssembleError> {
    let new = match assemble(draft, ctx) {
        Ok(new) => new,
        Err(err) => {
            if let AssembleError::Invalid(errors) = &err {
                info!(invalid_fields = errors.len(), "test draft rejected");
            }
            return Err(err);
        }
    };
    match backend.create_test(new).await {
        Ok(test) => {
            info!(test_id = %test.id, name = %test.name, "test created");
            Ok(test)
        }
        Err(err) => {
            warn!(error = %err, backend = backend.backend_tag(), "test creation failed");
            Err(AssembleError::Backend(err))
        }
    }
}
