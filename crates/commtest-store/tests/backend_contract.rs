// SPDX-License-Identifier: Apache-2.0

use commtest_core::{AssetId, InputId, JobId, ResultId};
use commtest_model::{
    Asset, Expectation, Job, NewTest, ResponseValue, ResultDraft, ResultStatus, ScalarInput,
    ScalarType, TestInput, TestResultResponse,
};
use commtest_store::{
    ChangeTable, InMemoryBackend, LocalFsBackend, StoreErrorCode, TestBackend,
};
use std::sync::atomic::Ordering;
use tempfile::tempdir;

fn job() -> JobId {
    JobId::new("job-7").expect("job")
}

fn input_id() -> InputId {
    InputId::new("ir").expect("input")
}

fn new_test() -> NewTest {
    NewTest {
        name: "Insulation Resistance".to_string(),
        description: None,
        instructions: None,
        job_id: job(),
        asset_id: None,
        asset_type: Some("switchboard".to_string()),
        inputs: vec![TestInput::scalar(
            input_id(),
            "Phase to earth",
            0,
            ScalarInput {
                value_type: ScalarType::Number,
                unit: Some("MΩ".to_string()),
                expectation: Expectation::minimum(1.0),
            },
        )],
    }
}

fn draft_for(test: &commtest_model::TestDefinition, value: f64) -> ResultDraft {
    ResultDraft {
        id: None,
        test_id: test.id.clone(),
        job_id: Some(job()),
        asset_ids: vec![AssetId::new("msb-1").expect("asset")],
        responses: vec![TestResultResponse::scalar(
            input_id(),
            Some(ResponseValue::Number(value)),
        )],
        status: ResultStatus::Draft,
        submitted_by: None,
    }
}

async fn exercise_contract(backend: &dyn TestBackend) {
    let mut feed = backend.subscribe();
    let test = backend.create_test(new_test()).await.expect("create");
    let notice = feed.recv().await.expect("notice");
    assert_eq!(notice.table, ChangeTable::Tests);
    assert_eq!(notice.scope, "job-7");

    let loaded = backend.get_test(&test.id).await.expect("get");
    assert_eq!(loaded.inputs, test.inputs);
    assert_eq!(backend.list_tests(Some(&job())).await.expect("list").len(), 1);
    assert!(backend
        .list_tests(Some(&JobId::new("other").expect("job")))
        .await
        .expect("list")
        .is_empty());

    let first = backend.save_result(draft_for(&test, 0.5)).await.expect("insert");
    assert_eq!(first.status, ResultStatus::Draft);
    assert_eq!(first.submitted_at, None);
    assert_eq!(feed.recv().await.expect("notice").table, ChangeTable::TestResults);

    let mut update = draft_for(&test, 2.5);
    update.id = Some(first.id.clone());
    update.status = ResultStatus::Submitted;
    update.submitted_by = Some("tech@example.com".to_string());
    let second = backend.save_result(update).await.expect("update");
    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at >= first.updated_at);
    assert!(second.submitted_at.is_some());
    assert_eq!(second.submitted_by.as_deref(), Some("tech@example.com"));

    let results = backend.list_results(&test.id).await.expect("results");
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].responses[0].value,
        Some(ResponseValue::Number(2.5))
    );

    let mut unknown = draft_for(&test, 1.0);
    unknown.id = Some(ResultId::new("missing").expect("id"));
    let err = backend.save_result(unknown).await.expect_err("unknown id");
    assert_eq!(err.code, StoreErrorCode::NotFound);

    let mut orphan = draft_for(&test, 1.0);
    orphan.responses[0].input_id = InputId::new("nope").expect("id");
    let err = backend.save_result(orphan).await.expect_err("orphan");
    assert_eq!(err.code, StoreErrorCode::Validation);
}

#[tokio::test]
async fn in_memory_backend_honours_contract() {
    let backend = InMemoryBackend::new();
    exercise_contract(&backend).await;
    assert_eq!(backend.create_calls.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn local_fs_backend_honours_contract() {
    let root = tempdir().expect("tmp");
    let backend = LocalFsBackend::new(root.path().to_path_buf());
    exercise_contract(&backend).await;
}

#[tokio::test]
async fn injected_failure_affects_only_the_next_save() {
    let backend = InMemoryBackend::new();
    let test = backend.create_test(new_test()).await.expect("create");
    backend.fail_next_save();
    let err = backend
        .save_result(draft_for(&test, 1.0))
        .await
        .expect_err("injected");
    assert_eq!(err.code, StoreErrorCode::Unavailable);
    backend
        .save_result(draft_for(&test, 1.0))
        .await
        .expect("retry");
    assert_eq!(backend.save_calls.load(Ordering::Relaxed), 2);
}

#[tokio::test]
async fn assets_are_filtered_by_job() {
    let backend = InMemoryBackend::new();
    backend
        .insert_job(Job {
            id: job(),
            name: "Substation 4".to_string(),
        })
        .await;
    for (id, job_id) in [("msb-1", Some(job())), ("db-2", None)] {
        backend
            .insert_asset(Asset {
                id: AssetId::new(id).expect("asset"),
                name: id.to_uppercase(),
                asset_type: Some("switchboard".to_string()),
                job_id,
            })
            .await;
    }
    assert_eq!(backend.list_assets(None).await.expect("all").len(), 2);
    let scoped = backend.list_assets(Some(&job())).await.expect("scoped");
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].id.as_str(), "msb-1");
    assert_eq!(backend.list_jobs().await.expect("jobs").len(), 1);
}

#[tokio::test]
async fn local_fs_reads_legacy_singular_asset_id() {
    let root = tempdir().expect("tmp");
    let backend = LocalFsBackend::new(root.path().to_path_buf());
    let test = backend.create_test(new_test()).await.expect("create");
    let dir = root.path().join("results").join(test.id.as_str());
    std::fs::create_dir_all(&dir).expect("dir");
    std::fs::write(
        dir.join("legacy.json"),
        format!(
            r#"{{"id":"legacy","test_id":"{}","asset_id":"msb-1","responses":[],"status":"submitted","created_at":"2024-03-01T10:00:00Z"}}"#,
            test.id
        ),
    )
    .expect("write");
    let results = backend.list_results(&test.id).await.expect("results");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].asset_ids, vec![AssetId::new("msb-1").expect("asset")]);
    assert_eq!(results[0].updated_at, results[0].created_at);
}

#[tokio::test]
async fn local_fs_catalogs_default_to_empty_and_import() {
    let root = tempdir().expect("tmp");
    let backend = LocalFsBackend::new(root.path().to_path_buf());
    assert!(backend.list_assets(None).await.expect("assets").is_empty());
    backend
        .import_assets(&[Asset {
            id: AssetId::new("msb-1").expect("asset"),
            name: "Main switchboard".to_string(),
            asset_type: None,
            job_id: None,
        }])
        .await
        .expect("import");
    assert_eq!(backend.list_assets(None).await.expect("assets").len(), 1);
    let err = backend
        .get_test(&commtest_core::TestId::new("absent").expect("id"))
        .await
        .expect_err("missing");
    assert_eq!(err.code, StoreErrorCode::NotFound);
}
