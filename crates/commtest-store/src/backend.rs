// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use commtest_core::{JobId, ResultId, TestId};
use commtest_model::{
    Asset, Job, NewTest, ResultDraft, ResultStatus, TestDefinition, TestResult,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::{StoreError, StoreErrorCode};

/// Buffered notices per subscriber before the oldest are dropped.
pub const CHANGE_FEED_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Tests,
    TestResults,
    Assets,
    Jobs,
}

/// "Something changed in `table` for `scope`". Receivers refetch the whole list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    pub table: ChangeTable,
    pub scope: String,
}

impl ChangeNotice {
    #[must_use]
    pub fn new(table: ChangeTable, scope: impl Into<String>) -> Self {
        Self {
            table,
            scope: scope.into(),
        }
    }
}

#[async_trait]
pub trait TestBackend: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// Persists a new test with its ordered inputs and assigns its id.
    async fn create_test(&self, new: NewTest) -> Result<TestDefinition, StoreError>;

    async fn get_test(&self, id: &TestId) -> Result<TestDefinition, StoreError>;

    async fn list_tests(&self, job: Option<&JobId>) -> Result<Vec<TestDefinition>, StoreError>;

    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError>;

    async fn list_assets(&self, job: Option<&JobId>) -> Result<Vec<Asset>, StoreError>;

    async fn list_results(&self, test: &TestId) -> Result<Vec<TestResult>, StoreError>;

    /// Inserts when `draft.id` is `None`, otherwise updates that result in place.
    async fn save_result(&self, draft: ResultDraft) -> Result<TestResult, StoreError>;

    fn subscribe(&self) -> broadcast::Receiver<ChangeNotice>;
}

pub(crate) fn check_new_test(new: &NewTest) -> Result<(), StoreError> {
    if new.name.trim().is_empty() {
        return Err(StoreError::new(
            StoreErrorCode::Validation,
            "test name must not be empty",
        ));
    }
    let mut ids = std::collections::BTreeSet::new();
    for input in &new.inputs {
        if !ids.insert(&input.id) {
            return Err(StoreError::new(
                StoreErrorCode::Conflict,
                format!("duplicate input id {}", input.id),
            ));
        }
    }
    Ok(())
}

/// Rejects responses that reference inputs the test does not declare.
pub(crate) fn check_responses(test: &TestDefinition, draft: &ResultDraft) -> Result<(), StoreError> {
    match draft
        .responses
        .iter()
        .find(|r| test.input(&r.input_id).is_none())
    {
        Some(orphan) => Err(StoreError::new(
            StoreErrorCode::Validation,
            format!(
                "response references unknown input {} of test {}",
                orphan.input_id, test.id
            ),
        )),
        None => Ok(()),
    }
}

/// Builds the stored row for `draft`, carrying creation and submission
/// metadata over from `existing` when updating.
pub(crate) fn apply_draft(
    existing: Option<&TestResult>,
    draft: ResultDraft,
    now: DateTime<Utc>,
) -> TestResult {
    let submitted = draft.status == ResultStatus::Submitted;
    let submitted_at = match existing {
        Some(prev) if submitted && prev.status == ResultStatus::Submitted => prev.submitted_at,
        _ if submitted => Some(now),
        _ => None,
    };
    TestResult {
        id: draft
            .id
            .or_else(|| existing.map(|e| e.id.clone()))
            .unwrap_or_else(ResultId::generate),
        test_id: draft.test_id,
        job_id: draft.job_id,
        asset_ids: draft.asset_ids,
        responses: draft.responses,
        status: draft.status,
        submitted_by: if submitted { draft.submitted_by } else { None },
        submitted_at,
        created_at: existing.map_or(now, |e| e.created_at),
        updated_at: now,
    }
}

pub(crate) fn publish(sender: &broadcast::Sender<ChangeNotice>, notice: ChangeNotice) {
    // No receivers is not an error.
    let _ = sender.send(notice);
}
