// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use chrono::Utc;
use commtest_core::canonical::{document_bytes, ContentDigest};
use commtest_core::{JobId, ResultId, TestId};
use commtest_model::{Asset, Job, NewTest, ResultDraft, TestDefinition, TestResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::backend::{
    apply_draft, check_new_test, check_responses, publish, ChangeNotice, ChangeTable, TestBackend,
    CHANGE_FEED_CAPACITY,
};
use crate::error::{StoreError, StoreErrorCode};

pub const TESTS_DIR: &str = "tests";
pub const RESULTS_DIR: &str = "results";
pub const JOBS_FILE: &str = "jobs.json";
pub const ASSETS_FILE: &str = "assets.json";

/// JSON-file backend rooted at a data directory:
/// `tests/<test>.json`, `results/<test>/<result>.json`, `jobs.json`, `assets.json`.
pub struct LocalFsBackend {
    root: PathBuf,
    write_lock: Mutex<()>,
    changes: broadcast::Sender<ChangeNotice>,
}

impl LocalFsBackend {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            root,
            write_lock: Mutex::new(()),
            changes,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn test_path(&self, id: &TestId) -> PathBuf {
        self.root.join(TESTS_DIR).join(format!("{id}.json"))
    }

    fn results_dir(&self, test: &TestId) -> PathBuf {
        self.root.join(RESULTS_DIR).join(test.as_str())
    }

    fn result_path(&self, test: &TestId, id: &ResultId) -> PathBuf {
        self.results_dir(test).join(format!("{id}.json"))
    }

    /// Replaces the job catalog.
    pub async fn import_jobs(&self, jobs: &[Job]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        write_json(&self.root.join(JOBS_FILE), &jobs)?;
        publish(&self.changes, ChangeNotice::new(ChangeTable::Jobs, ""));
        Ok(())
    }

    /// Replaces the asset catalog.
    pub async fn import_assets(&self, assets: &[Asset]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        write_json(&self.root.join(ASSETS_FILE), &assets)?;
        publish(&self.changes, ChangeNotice::new(ChangeTable::Assets, ""));
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let bytes = fs::read(path).map_err(|e| StoreError::io(&path.display().to_string(), &e))?;
    serde_json::from_slice(&bytes).map_err(|e| {
        StoreError::new(
            StoreErrorCode::Validation,
            format!("{} parse failed: {e}", path.display()),
        )
    })
}

fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    if !path.exists() {
        return Ok(T::default());
    }
    read_json(path)
}

/// Writes through a sibling temp file and renames into place.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let parent = path.parent().ok_or_else(|| {
        StoreError::new(
            StoreErrorCode::Internal,
            format!("{} has no parent directory", path.display()),
        )
    })?;
    fs::create_dir_all(parent).map_err(|e| StoreError::io("create data dir", &e))?;
    let bytes = document_bytes(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &bytes).map_err(|e| StoreError::io("write temp file", &e))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::io("rename into place", &e))?;
    debug!(
        path = %path.display(),
        bytes = bytes.len(),
        digest = %ContentDigest::of_bytes(&bytes),
        "wrote json"
    );
    Ok(())
}

fn read_dir_json<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, StoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| StoreError::io("list data dir", &e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    paths.iter().map(|p| read_json(p)).collect()
}

#[async_trait]
impl TestBackend for LocalFsBackend {
    fn backend_tag(&self) -> &'static str {
        "localfs"
    }

    async fn create_test(&self, new: NewTest) -> Result<TestDefinition, StoreError> {
        check_new_test(&new)?;
        let test = TestDefinition::from_new(TestId::generate(), new, Utc::now());
        let _guard = self.write_lock.lock().await;
        write_json(&self.test_path(&test.id), &test)?;
        info!(test_id = %test.id, inputs = test.inputs.len(), backend = "localfs", "test created");
        publish(
            &self.changes,
            ChangeNotice::new(ChangeTable::Tests, test.job_id.to_string()),
        );
        Ok(test)
    }

    async fn get_test(&self, id: &TestId) -> Result<TestDefinition, StoreError> {
        let path = self.test_path(id);
        if !path.exists() {
            return Err(StoreError::new(
                StoreErrorCode::NotFound,
                format!("test {id} not found"),
            ));
        }
        read_json(&path)
    }

    async fn list_tests(&self, job: Option<&JobId>) -> Result<Vec<TestDefinition>, StoreError> {
        let tests: Vec<TestDefinition> = read_dir_json(&self.root.join(TESTS_DIR))?;
        Ok(tests
            .into_iter()
            .filter(|t| job.map_or(true, |j| &t.job_id == j))
            .collect())
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        read_json_or_default(&self.root.join(JOBS_FILE))
    }

    async fn list_assets(&self, job: Option<&JobId>) -> Result<Vec<Asset>, StoreError> {
        let assets: Vec<Asset> = read_json_or_default(&self.root.join(ASSETS_FILE))?;
        Ok(assets
            .into_iter()
            .filter(|a| job.map_or(true, |j| a.job_id.as_ref() == Some(j)))
            .collect())
    }

    async fn list_results(&self, test: &TestId) -> Result<Vec<TestResult>, StoreError> {
        read_dir_json(&self.results_dir(test))
    }

    async fn save_result(&self, draft: ResultDraft) -> Result<TestResult, StoreError> {
        let test = self.get_test(&draft.test_id).await?;
        check_responses(&test, &draft)?;
        let _guard = self.write_lock.lock().await;
        let existing: Option<TestResult> = match &draft.id {
            Some(id) => {
                let path = self.result_path(&draft.test_id, id);
                if !path.exists() {
                    return Err(StoreError::new(
                        StoreErrorCode::NotFound,
                        format!("result {id} not found"),
                    ));
                }
                Some(read_json(&path)?)
            }
            None => None,
        };
        let result = apply_draft(existing.as_ref(), draft, Utc::now());
        write_json(&self.result_path(&result.test_id, &result.id), &result)?;
        info!(
            result_id = %result.id,
            test_id = %result.test_id,
            status = result.status.as_str(),
            responses = result.responses.len(),
            backend = "localfs",
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
