// SPDX-License-Identifier: Apache-2.0

use commtest_core::JobId;
use commtest_forms::{
    assemble, create_test, validate_draft, AssembleError, AuthoringContext, DraftField,
    InputDraft, TestDraft,
};
use commtest_model::{
    CellContent, ExpectedType, Expectation, InputKind, NestedTableLayout, ScalarType,
    TableLayoutConfig,
};
use commtest_store::{InMemoryBackend, TestBackend};
use std::sync::atomic::Ordering;

fn job() -> JobId {
    JobId::new("job-1").expect("job")
}

fn ir_draft() -> TestDraft {
    TestDraft {
        name: "Insulation Resistance".to_string(),
        job_id: Some(job()),
        asset_type: Some("switchboard".to_string()),
        inputs: vec![
            InputDraft::scalar("Phase to earth", ScalarType::Number, Expectation::minimum(1.0))
                .with_unit("MΩ"),
        ],
        ..TestDraft::default()
    }
}

#[test]
fn every_problem_is_reported_at_once() {
    let draft = TestDraft {
        name: "  ".to_string(),
        inputs: vec![
            InputDraft::scalar(
                "",
                ScalarType::Number,
                Expectation {
                    expected_type: ExpectedType::Range,
                    expected_min: Some(1.0),
                    ..Expectation::default()
                },
            ),
            InputDraft::scalar(
                "Polarity",
                ScalarType::Number,
                Expectation {
                    expected_type: ExpectedType::Exact,
                    ..Expectation::default()
                },
            ),
        ],
        ..TestDraft::default()
    };
    let errors = validate_draft(&draft, &AuthoringContext::default()).expect_err("invalid");
    assert_eq!(errors[&DraftField::Name], "Enter a test name");
    assert_eq!(errors[&DraftField::Job], "Select a job");
    assert_eq!(errors[&DraftField::InputLabel(0)], "Enter a label");
    assert_eq!(errors[&DraftField::InputMax(0)], "Enter a maximum value");
    assert_eq!(errors[&DraftField::InputValue(1)], "Enter an expected value");
    assert!(!errors.contains_key(&DraftField::InputMin(0)));
    assert_eq!(errors.len(), 5);
}

#[test]
fn booleans_and_exact_text_need_no_bounds() {
    let draft = TestDraft {
        inputs: vec![
            InputDraft::scalar(
                "Labels fitted",
                ScalarType::Boolean,
                Expectation {
                    expected_type: ExpectedType::Exact,
                    ..Expectation::default()
                },
            ),
            InputDraft::scalar(
                "Serial",
                ScalarType::Text,
                Expectation {
                    expected_type: ExpectedType::Exact,
                    ..Expectation::default()
                },
            ),
        ],
        ..ir_draft()
    };
    validate_draft(&draft, &AuthoringContext::default()).expect("valid");
}

#[test]
fn locked_job_satisfies_the_job_requirement() {
    let draft = TestDraft {
        job_id: None,
        ..ir_draft()
    };
    let ctx = AuthoringContext {
        locked_job: Some(JobId::new("locked").expect("job")),
        locked_asset: None,
    };
    let new = assemble(&draft, &ctx).expect("assemble");
    assert_eq!(new.job_id.as_str(), "locked");
}

#[test]
fn assembled_inputs_keep_draft_order_and_reconcile_tables() {
    let mut sparse = TableLayoutConfig::filled(
        vec!["L1".to_string(), "L2".to_string()],
        vec!["Reading".to_string()],
        ScalarType::Number,
    );
    sparse.cells.truncate(1);
    let draft = TestDraft {
        inputs: vec![
            InputDraft::scalar("Visual check", ScalarType::Boolean, Expectation::default()),
            InputDraft::table("Phase readings", sparse),
            InputDraft::nested_table("Breakdown", NestedTableLayout::new(2, 2)),
        ],
        ..ir_draft()
    };
    let new = assemble(&draft, &AuthoringContext::default()).expect("assemble");
    let positions: Vec<u32> = new.inputs.iter().map(|i| i.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);
    let InputKind::Table(layout) = &new.inputs[1].kind else {
        panic!("expected a flat table");
    };
    assert!(layout.is_complete());
    assert_eq!(layout.cells.len(), 2);
    assert!(matches!(&new.inputs[2].kind, InputKind::NestedTable(n) if n.cells.len() == 4));
}

#[test]
fn table_inputs_without_layout_are_rejected() {
    let mut input = InputDraft::table("Phases", TableLayoutConfig::default());
    input.table_layout = None;
    let draft = TestDraft {
        inputs: vec![input],
        ..ir_draft()
    };
    let err = assemble(&draft, &AuthoringContext::default()).expect_err("missing layout");
    let AssembleError::Invalid(errors) = err else {
        panic!("expected validation errors");
    };
    assert_eq!(
        errors[&DraftField::InputLayout(0)],
        "Configure the table layout"
    );
}

#[test]
fn broken_nested_coverage_is_a_layout_error() {
    let mut layout = NestedTableLayout::new(2, 2);
    layout.cells[0].col_span = 2;
    layout.cells[0].content = CellContent::Header {
        header_text: "Overlap".to_string(),
    };
    let draft = TestDraft {
        inputs: vec![InputDraft::nested_table("Grid", layout)],
        ..ir_draft()
    };
    let errors = validate_draft(&draft, &AuthoringContext::default()).expect_err("overlap");
    assert!(errors.contains_key(&DraftField::InputLayout(0)));
}

#[test]
fn oversized_nested_layouts_are_validation_errors() {
    let mut runaway_span = NestedTableLayout::new(3, 2);
    runaway_span.cells[4].row_span = usize::MAX;
    let huge = usize::try_from(1_u64 << 32).unwrap_or(usize::MAX);
    let huge_grid = NestedTableLayout {
        rows: huge,
        columns: huge,
        cells: Vec::new(),
        header_rows: Vec::new(),
    };
    for layout in [runaway_span, huge_grid] {
        let draft = TestDraft {
            inputs: vec![InputDraft::nested_table("Grid", layout)],
            ..ir_draft()
        };
        let errors = validate_draft(&draft, &AuthoringContext::default()).expect_err("rejected");
        assert!(errors.contains_key(&DraftField::InputLayout(0)));
    }
}

#[test]
fn draft_json_rejects_unknown_keys() {
    let raw = r#"{"name":"x","job_id":"job-1","inputs":[],"colour":"red"}"#;
    assert!(serde_json::from_str::<TestDraft>(raw).is_err());
    let raw = r#"{"name":"x","job_id":"job-1","inputs":[{"label":"V","input_type":"number","expected_type":"maximum","expected_max":250}]}"#;
    let draft: TestDraft = serde_json::from_str(raw).expect("draft");
    validate_draft(&draft, &AuthoringContext::default()).expect("valid");
}

#[tokio::test]
async fn create_persists_once_and_invalid_drafts_never_reach_the_backend() {
    let backend = InMemoryBackend::new();
    let invalid = TestDraft {
        name: String::new(),
        ..ir_draft()
    };
    assert!(create_test(&backend, &invalid, &AuthoringContext::default())
        .await
        .is_err());
    assert_eq!(backend.create_calls.load(Ordering::SeqCst), 0);

    let test = create_test(&backend, &ir_draft(), &AuthoringContext::default())
        .await
        .expect("create");
    assert_eq!(backend.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(test.name, "Insulation Resistance");
    let stored = backend.get_test(&test.id).await.expect("stored");
    assert_eq!(stored.inputs.len(), 1);
    assert_eq!(stored.inputs[0].kind, test.inputs[0].kind);
}

