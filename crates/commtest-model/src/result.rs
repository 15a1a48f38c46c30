// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use commtest_core::{AssetId, JobId, ResultId, TestId};
use serde::{Deserialize, Serialize};

use crate::response::TestResultResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    #[default]
    Draft,
    Submitted,
}

impl ResultStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
        }
    }
}

/// A saved set of responses to one test for one or more assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TestResultRecord")]
pub struct TestResult {
    pub id: ResultId,
    pub test_id: TestId,
    pub job_id: Option<JobId>,
    pub asset_ids: Vec<AssetId>,
    pub responses: Vec<TestResultResponse>,
    pub status: ResultStatus,
    pub submitted_by: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestResult {
    #[must_use]
    pub fn covers_asset(&self, asset: &AssetId) -> bool {
        self.asset_ids.contains(asset)
    }
}

/// Decoding shape that also accepts the legacy singular `asset_id`.
#[derive(Debug, Clone, Deserialize)]
struct TestResultRecord {
    id: ResultId,
    test_id: TestId,
    #[serde(default)]
    job_id: Option<JobId>,
    #[serde(default)]
    asset_id: Option<AssetId>,
    #[serde(default)]
    asset_ids: Vec<AssetId>,
    #[serde(default)]
    responses: Vec<TestResultResponse>,
    #[serde(default)]
    status: ResultStatus,
    #[serde(default)]
    submitted_by: Option<String>,
    #[serde(default)]
    submitted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl From<TestResultRecord> for TestResult {
    fn from(record: TestResultRecord) -> Self {
        let mut asset_ids = record.asset_ids;
        if let Some(legacy) = record.asset_id {
            if !asset_ids.contains(&legacy) {
                asset_ids.insert(0, legacy);
            }
        }
        Self {
            id: record.id,
            test_id: record.test_id,
            job_id: record.job_id,
            asset_ids,
            responses: record.responses,
            status: record.status,
            submitted_by: record.submitted_by,
            submitted_at: record.submitted_at,
            created_at: record.created_at,
            updated_at: record.updated_at.unwrap_or(record.created_at),
        }
    }
}

/// Save payload: inserts when `id` is `None`, otherwise updates that result in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDraft {
    pub id: Option<ResultId>,
    pub test_id: TestId,
    pub job_id: Option<JobId>,
    pub asset_ids: Vec<AssetId>,
    pub responses: Vec<TestResultResponse>,
    pub status: ResultStatus,
    pub submitted_by: Option<String>,
}
