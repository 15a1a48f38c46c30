// SPDX-License-Identifier: Apache-2.0

use commtest_core::{AssetId, InputId, ResultId, TestId};
use commtest_layout::{flat, nested, CellKey, FieldErrors, RawValue, ValueMap};
use commtest_model::{
    Asset, Expectation, InputKind, ResponseValue, ResultDraft, ResultStatus, ScalarType,
    TestDefinition, TestResult, TestResultResponse,
};
use commtest_store::{StoreError, TestBackend};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::evaluate::{evaluate, Verdict};

pub const MSG_ENTER_VALUE: &str = "Enter a value";
pub const MSG_INVALID_NUMBER: &str = "Enter a valid number";
pub const MSG_SELECT_ASSET: &str = "Select at least one asset";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Loading,
    Editing,
    Validating,
    Submitting,
}

impl SessionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Loading => "loading",
            Self::Editing => "editing",
            Self::Validating => "validating",
            Self::Submitting => "submitting",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenOptions {
    pub locked_asset: Option<AssetId>,
    pub result_id: Option<ResultId>,
}

#[derive(Debug)]
pub enum EngineError {
    NotEditing(SessionState),
    UnknownField(String),
    AmbiguousField(String),
    UnknownAsset(AssetId),
    AssetLocked,
    ResultNotFound(ResultId),
    Invalid { fields: usize },
    Backend(StoreError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotEditing(state) => write!(f, "session is {}, not editing", state.as_str()),
            Self::UnknownField(key) => write!(f, "no field {key} in this test"),
            Self::AmbiguousField(key) => write!(
                f,
                "field {key} matches more than one field; use the input:row.col form"
            ),
            Self::UnknownAsset(id) => write!(f, "asset {id} is not selectable for this test"),
            Self::AssetLocked => f.write_str("asset selection is locked"),
            Self::ResultNotFound(id) => write!(f, "result {id} not found for this test"),
            Self::Invalid { fields } => write!(f, "{fields} field(s) need attention"),
            Self::Backend(err) => write!(f, "save failed: {err}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        Self::Backend(value)
    }
}

/// One editable value of the test: a scalar input or an enabled table cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: CellKey,
    pub label: String,
    pub value_type: ScalarType,
    pub unit: Option<String>,
    pub expectation: Option<Expectation>,
}

/// Every field of `test`, in input order then row-major cell order.
#[must_use]
pub fn collect_fields(test: &TestDefinition) -> Vec<Field> {
    let mut out = Vec::new();
    for input in test.ordered_inputs() {
        let cells = match &input.kind {
            InputKind::Scalar(s) => {
                out.push(Field {
                    key: CellKey::scalar(input.id.clone()),
                    label: input.label.clone(),
                    value_type: s.value_type,
                    unit: s.unit.clone(),
                    expectation: Some(s.expectation),
                });
                continue;
            }
            InputKind::Table(layout) => flat::flat_input_cells(layout, &input.id),
            InputKind::NestedTable(layout) => nested::nested_input_cells(layout, &input.id),
            InputKind::MissingLayout(_) => continue,
        };
        out.extend(cells.into_iter().map(|cell| Field {
            label: cell
                .label
                .unwrap_or_else(|| format!("{} {}", input.label, cell.key)),
            key: cell.key,
            value_type: cell.input_type,
            unit: cell.unit,
            expectation: cell.expectation,
        }));
    }
    out
}

/// Assets a result may be recorded against: those of the declared type, or all.
#[must_use]
pub fn selectable_assets(assets: Vec<Asset>, asset_type: Option<&str>) -> Vec<Asset> {
    match asset_type.map(str::trim).filter(|t| !t.is_empty()) {
        Some(wanted) => assets
            .into_iter()
            .filter(|a| a.asset_type.as_deref() == Some(wanted))
            .collect(),
        None => assets,
    }
}

/// Most recently updated result, among those covering `asset` when given.
/// Equal timestamps resolve to the greater id.
#[must_use]
pub fn latest_result<'a>(results: &'a [TestResult], asset: Option<&AssetId>) -> Option<&'a TestResult> {
    results
        .iter()
        .filter(|r| asset.map_or(true, |a| r.covers_asset(a)))
        .max_by(|a, b| {
            a.updated_at
                .cmp(&b.updated_at)
                .then_with(|| a.id.cmp(&b.id))
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSelection {
    Locked(AssetId),
    Choice {
        available: Vec<Asset>,
        selected: BTreeSet<AssetId>,
    },
}

impl AssetSelection {
    #[must_use]
    pub fn selected_ids(&self) -> Vec<AssetId> {
        match self {
            Self::Locked(id) => vec![id.clone()],
            Self::Choice { selected, .. } => selected.iter().cloned().collect(),
        }
    }
}

/// Editing state for one result of one test.
///
/// `open` loads the test and any prior result, then edits accumulate in
/// local maps until `submit` serializes them into a single save call. A
/// failed save leaves every edit in place.
pub struct ResultSession {
    backend: Arc<dyn TestBackend>,
    state: SessionState,
    test: TestDefinition,
    fields: Vec<Field>,
    values: ValueMap,
    notes: BTreeMap<InputId, String>,
    errors: FieldErrors,
    asset_error: Option<String>,
    assets: AssetSelection,
    result_id: Option<ResultId>,
    banner: Option<String>,
}

impl ResultSession {
    pub async fn open(
        backend: Arc<dyn TestBackend>,
        test_id: &TestId,
        options: OpenOptions,
    ) -> Result<Self, EngineError> {
        debug!(test_id = %test_id, state = SessionState::Loading.as_str(), "opening result session");
        let test = backend.get_test(test_id).await?;
        let results = backend.list_results(test_id).await?;
        let prior = match &options.result_id {
            Some(id) => Some(
                results
                    .iter()
                    .find(|r| &r.id == id)
                    .ok_or_else(|| EngineError::ResultNotFound(id.clone()))?,
            ),
            None => latest_result(&results, options.locked_asset.as_ref()),
        };
        let assets = match options.locked_asset {
            Some(locked) => AssetSelection::Locked(locked),
            None => AssetSelection::Choice {
                available: selectable_assets(
                    backend.list_assets(None).await?,
                    test.asset_type.as_deref(),
                ),
                selected: prior
                    .map(|r| r.asset_ids.iter().cloned().collect())
                    .unwrap_or_default(),
            },
        };
        let mut values = ValueMap::new();
        let mut notes = BTreeMap::new();
        if let Some(prior) = prior {
            for response in &prior.responses {
                let key = CellKey {
                    input_id: response.input_id.clone(),
                    path: response.cell_path(),
                };
                if let Some(value) = &response.value {
                    values.insert(key, RawValue::from_response(value));
                }
                if let Some(text) = response.notes.as_deref().filter(|t| !t.is_empty()) {
                    notes
                        .entry(response.input_id.clone())
                        .or_insert_with(|| text.to_string());
                }
            }
        }
        info!(
            test_id = %test.id,
            prior = prior.map(|r| r.id.to_string()).unwrap_or_default(),
            loaded_values = values.len(),
            "result session editing"
        );
        Ok(Self {
            fields: collect_fields(&test),
            result_id: prior.map(|r| r.id.clone()),
            backend,
            state: SessionState::Editing,
            test,
            values,
            notes,
            errors: FieldErrors::new(),
            asset_error: None,
            assets,
            banner: None,
        })
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn test(&self) -> &TestDefinition {
        &self.test
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub const fn values(&self) -> &ValueMap {
        &self.values
    }

    #[must_use]
    pub const fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    #[must_use]
    pub fn asset_error(&self) -> Option<&str> {
        self.asset_error.as_deref()
    }

    #[must_use]
    pub const fn assets(&self) -> &AssetSelection {
        &self.assets
    }

    #[must_use]
    pub fn notes(&self, input: &InputId) -> Option<&str> {
        self.notes.get(input).map(String::as_str)
    }

    /// Prior or last saved result this session updates.
    #[must_use]
    pub const fn result_id(&self) -> Option<&ResultId> {
        self.result_id.as_ref()
    }

    /// Error from the last failed save, until the next edit or save.
    #[must_use]
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Looks up a field by its qualified key (`grid`, `grid:0.1`), then by
    /// its display key (`grid_0_1`). A display key shared by several fields
    /// is an error.
    pub fn field_named(&self, name: &str) -> Result<&Field, EngineError> {
        if let Some(field) = name.parse::<CellKey>().ok().and_then(|key| self.field(&key)) {
            return Ok(field);
        }
        let mut matches = self.fields.iter().filter(|f| f.key.to_string() == name);
        match (matches.next(), matches.next()) {
            (Some(field), None) => Ok(field),
            (Some(_), Some(_)) => Err(EngineError::AmbiguousField(name.to_string())),
            (None, _) => Err(EngineError::UnknownField(name.to_string())),
        }
    }

    fn field(&self, key: &CellKey) -> Option<&Field> {
        self.fields.iter().find(|f| &f.key == key)
    }

    fn ensure_editing(&self) -> Result<(), EngineError> {
        if self.state == SessionState::Editing {
            Ok(())
        } else {
            Err(EngineError::NotEditing(self.state))
        }
    }

    pub fn set_value(&mut self, key: &CellKey, value: RawValue) -> Result<(), EngineError> {
        self.ensure_editing()?;
        if self.field(key).is_none() {
            return Err(EngineError::UnknownField(key.to_string()));
        }
        self.errors.remove(key);
        self.banner = None;
        self.values.insert(key.clone(), value);
        Ok(())
    }

    pub fn set_notes(&mut self, input: &InputId, text: &str) -> Result<(), EngineError> {
        self.ensure_editing()?;
        if self.test.input(input).is_none() {
            return Err(EngineError::UnknownField(input.to_string()));
        }
        if text.trim().is_empty() {
            self.notes.remove(input);
        } else {
            self.notes.insert(input.clone(), text.to_string());
        }
        Ok(())
    }

    /// Flips selection of `asset`; returns whether it is now selected.
    pub fn toggle_asset(&mut self, asset: &AssetId) -> Result<bool, EngineError> {
        self.ensure_editing()?;
        let AssetSelection::Choice {
            available,
            selected,
        } = &mut self.assets
        else {
            return Err(EngineError::AssetLocked);
        };
        if !available.iter().any(|a| &a.id == asset) {
            return Err(EngineError::UnknownAsset(asset.clone()));
        }
        self.asset_error = None;
        if selected.remove(asset) {
            Ok(false)
        } else {
            selected.insert(asset.clone());
            Ok(true)
        }
    }

    /// Advisory verdict for the current value of `key`.
    #[must_use]
    pub fn verdict_for(&self, key: &CellKey) -> Option<Verdict> {
        let field = self.field(key)?;
        let expectation = field.expectation.as_ref()?;
        evaluate(
            expectation,
            field.value_type,
            field.unit.as_deref(),
            self.values.get(key)?,
        )
    }

    /// Verdicts of every field that currently has one.
    #[must_use]
    pub fn verdicts(&self) -> Vec<(CellKey, Verdict)> {
        self.fields
            .iter()
            .filter_map(|f| self.verdict_for(&f.key).map(|v| (f.key.clone(), v)))
            .collect()
    }

    fn field_error(field: &Field, value: Option<&RawValue>) -> Option<&'static str> {
        match field.value_type {
            // An untouched checkbox is a "No".
            ScalarType::Boolean => match value {
                Some(v) if v.as_bool().is_none() => Some(MSG_ENTER_VALUE),
                _ => None,
            },
            ScalarType::Text => match value {
                Some(v) if !v.is_blank() => None,
                _ => Some(MSG_ENTER_VALUE),
            },
            ScalarType::Number => match value {
                Some(v) if v.is_blank() => Some(MSG_ENTER_VALUE),
                Some(v) if v.as_number().is_none() => Some(MSG_INVALID_NUMBER),
                Some(_) => None,
                None => Some(MSG_ENTER_VALUE),
            },
        }
    }

    /// Completeness check run before a submitted save. Errors are kept for
    /// inline display and also returned.
    pub fn validate(&mut self) -> Result<(), FieldErrors> {
        let resume = self.state;
        self.state = SessionState::Validating;
        let mut errors = FieldErrors::new();
        for field in &self.fields {
            if let Some(msg) = Self::field_error(field, self.values.get(&field.key)) {
                errors.insert(field.key.clone(), msg.to_string());
            }
        }
        self.asset_error = match &self.assets {
            AssetSelection::Choice { selected, .. } if selected.is_empty() => {
                Some(MSG_SELECT_ASSET.to_string())
            }
            _ => None,
        };
        self.errors = errors.clone();
        self.state = resume;
        if errors.is_empty() && self.asset_error.is_none() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Current values as persisted responses, one per field. Table cells carry
    /// their top-level position and any deeper path; input notes ride on the
    /// input's first response.
    #[must_use]
    pub fn responses(&self) -> Vec<TestResultResponse> {
        let mut noted = BTreeSet::new();
        self.fields
            .iter()
            .map(|field| {
                let raw = self.values.get(&field.key);
                let value = match (field.value_type, raw) {
                    (ScalarType::Boolean, None) => Some(ResponseValue::Boolean(false)),
                    (value_type, Some(raw)) => raw.to_response(value_type),
                    (_, None) => None,
                };
                let input_id = field.key.input_id.clone();
                let notes = if noted.insert(input_id.clone()) {
                    self.notes.get(&input_id).cloned()
                } else {
                    None
                };
                let (table_cell_position, nested_path) = match field.key.path.split_first() {
                    Some((first, rest)) => (Some(*first), rest.to_vec()),
                    None => (None, Vec::new()),
                };
                TestResultResponse {
                    input_id,
                    value,
                    notes,
                    table_cell_position,
                    nested_path,
                }
            })
            .collect()
    }

    /// Saves the result. A submitted save must pass `validate` first; a draft
    /// save skips completeness checks. On backend failure the session returns
    /// to editing with the error in `banner`.
    pub async fn submit(
        &mut self,
        status: ResultStatus,
        submitted_by: Option<String>,
    ) -> Result<TestResult, EngineError> {
        self.ensure_editing()?;
        if status == ResultStatus::Submitted {
            if let Err(errors) = self.validate() {
                let fields = errors.len() + usize::from(self.asset_error.is_some());
                info!(test_id = %self.test.id, fields, "result validation failed");
                return Err(EngineError::Invalid { fields });
            }
        }
        self.state = SessionState::Submitting;
        self.banner = None;
        let draft = ResultDraft {
            id: self.result_id.clone(),
            test_id: self.test.id.clone(),
            job_id: Some(self.test.job_id.clone()),
            asset_ids: self.assets.selected_ids(),
            responses: self.responses(),
            status,
            submitted_by,
        };
        match self.backend.save_result(draft).await {
            Ok(result) => {
                info!(
                    result_id = %result.id,
                    test_id = %result.test_id,
                    status = result.status.as_str(),
                    "result saved"
                );
                self.result_id = Some(result.id.clone());
                self.state = SessionState::Closed;
                Ok(result)
            }
            Err(err) => {
                warn!(test_id = %self.test.id, error = %err, "result save failed");
                self.banner = Some(err.to_string());
                self.state = SessionState::Editing;
                Err(EngineError::Backend(err))
            }
        }
    }

    /// Discards local edits.
    pub fn close(&mut self) {
        self.values.clear();
        self.notes.clear();
        self.errors.clear();
        self.asset_error = None;
        self.banner = None;
        self.state = SessionState::Closed;
    }
}
