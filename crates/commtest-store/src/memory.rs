// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use chrono::Utc;
use commtest_core::{JobId, ResultId, TestId};
use commtest_model::{Asset, Job, NewTest, ResultDraft, TestDefinition, TestResult};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::backend::{
    apply_draft, check_new_test, check_responses, publish, ChangeNotice, ChangeTable, TestBackend,
    CHANGE_FEED_CAPACITY,
};
use crate::error::{StoreError, StoreErrorCode};

#[derive(Default)]
struct State {
    tests: BTreeMap<TestId, TestDefinition>,
    results: BTreeMap<ResultId, TestResult>,
    jobs: Vec<Job>,
    assets: Vec<Asset>,
}

/// Process-local backend. Save calls are counted and the next save can be
/// made to fail, so callers can be exercised against backend errors.
pub struct InMemoryBackend {
    state: Mutex<State>,
    changes: broadcast::Sender<ChangeNotice>,
    pub save_calls: AtomicU64,
    pub create_calls: AtomicU64,
    fail_next_save: AtomicBool,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            state: Mutex::new(State::default()),
            changes,
            save_calls: AtomicU64::new(0),
            create_calls: AtomicU64::new(0),
            fail_next_save: AtomicBool::new(false),
        }
    }
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_job(&self, job: Job) {
        let scope = job.id.to_string();
        self.state.lock().await.jobs.push(job);
        publish(&self.changes, ChangeNotice::new(ChangeTable::Jobs, scope));
    }

    pub async fn insert_asset(&self, asset: Asset) {
        let scope = asset
            .job_id
            .as_ref()
            .map_or_else(String::new, ToString::to_string);
        self.state.lock().await.assets.push(asset);
        publish(&self.changes, ChangeNotice::new(ChangeTable::Assets, scope));
    }

    /// Makes the next `save_result` fail with `Unavailable`.
    pub fn fail_next_save(&self) {
        self.fail_next_save.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TestBackend for InMemoryBackend {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn create_test(&self, new: NewTest) -> Result<TestDefinition, StoreError> {
        self.create_calls.fetch_add(1, Ordering::Relaxed);
        check_new_test(&new)?;
        let test = TestDefinition::from_new(TestId::generate(), new, Utc::now());
        self.state
            .lock()
            .await
            .tests
            .insert(test.id.clone(), test.clone());
        info!(test_id = %test.id, inputs = test.inputs.len(), backend = "memory", "test created");
        publish(
            &self.changes,
            ChangeNotice::new(ChangeTable::Tests, test.job_id.to_string()),
        );
        Ok(test)
    }

    async fn get_test(&self, id: &TestId) -> Result<TestDefinition, StoreError> {
        self.state
            .lock()
            .await
            .tests
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::new(StoreErrorCode::NotFound, format!("test {id} not found")))
    }

    async fn list_tests(&self, job: Option<&JobId>) -> Result<Vec<TestDefinition>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .tests
            .values()
            .filter(|t| job.map_or(true, |j| &t.job_id == j))
            .cloned()
            .collect())
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self.state.lock().await.jobs.clone())
    }

    async fn list_assets(&self, job: Option<&JobId>) -> Result<Vec<Asset>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .assets
            .iter()
            .filter(|a| job.map_or(true, |j| a.job_id.as_ref() == Some(j)))
            .cloned()
            .collect())
    }

    async fn list_results(&self, test: &TestId) -> Result<Vec<TestResult>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .results
            .values()
            .filter(|r| &r.test_id == test)
            .cloned()
            .collect())
    }

    async fn save_result(&self, draft: ResultDraft) -> Result<TestResult, StoreError> {
        self.save_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_next_save.swap(false, Ordering::SeqCst) {
            warn!(test_id = %draft.test_id, backend = "memory", "injected save failure");
            return Err(StoreError::new(
                StoreErrorCode::Unavailable,
                "backend temporarily unavailable",
            ));
        }
        let mut state = self.state.lock().await;
        let test = state.tests.get(&draft.test_id).ok_or_else(|| {
            StoreError::new(
                StoreErrorCode::NotFound,
                format!("test {} not found", draft.test_id),
            )
        })?;
        check_responses(test, &draft)?;
        let existing = match &draft.id {
            Some(id) => Some(state.results.get(id).ok_or_else(|| {
                StoreError::new(StoreErrorCode::NotFound, format!("result {id} not found"))
            })?),
            None => None,
        };
        let result = apply_draft(existing, draft, Utc::now());
        state.results.insert(result.id.clone(), result.clone());
        drop(state);
        info!(
            result_id = %result.id,
            test_id = %result.test_id,
            status = result.status.as_str(),
            responses = result.responses.len(),
            "result saved"
        );
        publish(
            &self.changes,
            ChangeNotice::new(ChangeTable::TestResults, result.test_id.to_string()),
        );
        Ok(result)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.changes.subscribe()
    }
}
