use crate::commands::{
    BlobCommand, CatalogCommand, EvaluateArgs, LayoutCommand, ResultCommand, TestCommand,
    ValueTypeCli,
};
use crate::helpers::{
    emit_ok, emit_text, open_backend, open_blobs, parse_id, parse_opt_id, raw_value, read_json,
    runtime, store_error,
};
use crate::{CliError, OutputMode};
use commtest_core::{canonical, AssetId, CommtestConfig, InputId, JobId, ResultId, TestId};
use commtest_forms::{
    create_test, evaluate, validate_draft, AssembleError, AssetSelection, AuthoringContext,
    DraftErrors, EngineError, OpenOptions, ResultSession, TestDraft,
};
use commtest_layout::{flat, nested, text, CellKey, FieldErrors, RawValue, ValueMap};
use commtest_model::{Asset, Expectation, InputKind, Job, ResultStatus, TestResult};
use commtest_store::{BlobStore, TestBackend};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

fn draft_error(message: &str, errors: &DraftErrors) -> CliError {
    errors.iter().fold(CliError::validation(message), |err, (field, msg)| {
        err.with_detail(&field.to_string(), msg)
    })
}

fn engine_error(err: EngineError) -> CliError {
    match err {
        EngineError::Backend(store) => store_error(store),
        EngineError::ResultNotFound(_) | EngineError::Invalid { .. } => {
            CliError::validation(&err.to_string())
        }
        EngineError::UnknownField(_)
        | EngineError::AmbiguousField(_)
        | EngineError::UnknownAsset(_)
        | EngineError::AssetLocked
        | EngineError::NotEditing(_) => CliError::usage(&err.to_string()),
    }
}

fn authoring_context(job: Option<&str>, asset: Option<&str>) -> Result<AuthoringContext, CliError> {
    Ok(AuthoringContext {
        locked_job: parse_opt_id::<JobId>(job)?,
        locked_asset: parse_opt_id::<AssetId>(asset)?,
    })
}

pub(crate) fn run_test_command(
    command: TestCommand,
    config: &CommtestConfig,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    match command {
        TestCommand::Validate { draft } => {
            let parsed: TestDraft = read_json(&draft)?;
            validate_draft(&parsed, &AuthoringContext::default())
                .map_err(|errors| draft_error("test draft is invalid", &errors))?;
            let fingerprint =
                canonical::ContentDigest::of(&parsed).map_err(CliError::internal)?;
            emit_ok(
                output_mode,
                &json!({
                    "command": "test validate",
                    "status": "ok",
                    "inputs": parsed.inputs.len(),
                    "fingerprint": fingerprint,
                }),
            )
        }
        TestCommand::Create { draft, job, asset } => {
            let parsed: TestDraft = read_json(&draft)?;
            let ctx = authoring_context(job.as_deref(), asset.as_deref())?;
            let backend = open_backend(config);
            let test = runtime()?
                .block_on(create_test(&backend, &parsed, &ctx))
                .map_err(|err| match err {
                    AssembleError::Invalid(errors) => draft_error("test draft is invalid", &errors),
                    AssembleError::Backend(store) => store_error(store),
                })?;
            emit_ok(
                output_mode,
                &json!({
                    "command": "test create",
                    "status": "ok",
                    "test_id": test.id,
                    "inputs": test.inputs.len(),
                }),
            )
        }
        TestCommand::Show { test_id } => {
            let id: TestId = parse_id(&test_id)?;
            let test = runtime()?
                .block_on(open_backend(config).get_test(&id))
                .map_err(store_error)?;
            emit_ok(
                output_mode,
                &json!({ "summary": test.summary(), "test": test }),
            )
        }
        TestCommand::List { job } => {
            let job = parse_opt_id::<JobId>(job.as_deref())?;
            let tests = runtime()?
                .block_on(open_backend(config).list_tests(job.as_ref()))
                .map_err(store_error)?;
            let rows: Vec<Value> = tests
                .iter()
                .map(|t| {
                    json!({
                        "id": t.id,
                        "name": t.name,
                        "job_id": t.job_id,
                        "inputs": t.inputs.len(),
                    })
                })
                .collect();
            emit_ok(output_mode, &json!({ "tests": rows }))
        }
    }
}

fn values_for_input(result: &TestResult, input: &InputId) -> ValueMap {
    result
        .responses
        .iter()
        .filter(|r| &r.input_id == input)
        .filter_map(|r| {
            let value = r.value.as_ref()?;
            Some((
                CellKey {
                    input_id: r.input_id.clone(),
                    path: r.cell_path(),
                },
                RawValue::from_response(value),
            ))
        })
        .collect()
}

pub(crate) fn run_layout_command(
    command: LayoutCommand,
    config: &CommtestConfig,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let LayoutCommand::Render {
        test_id,
        input_id,
        result,
    } = command;
    let test_id: TestId = parse_id(&test_id)?;
    let input_id: InputId = parse_id(&input_id)?;
    let result_id = parse_opt_id::<ResultId>(result.as_deref())?;
    let backend = open_backend(config);
    let rt = runtime()?;
    let test = rt.block_on(backend.get_test(&test_id)).map_err(store_error)?;
    let input = test
        .input(&input_id)
        .ok_or_else(|| CliError::validation(&format!("input {input_id} not found in test {test_id}")))?;
    let values = match result_id {
        Some(rid) => {
            let results = rt.block_on(backend.list_results(&test_id)).map_err(store_error)?;
            let found = results
                .iter()
                .find(|r| r.id == rid)
                .ok_or_else(|| CliError::validation(&format!("result {rid} not found")))?;
            values_for_input(found, &input_id)
        }
        None => ValueMap::new(),
    };
    let errors = FieldErrors::new();
    match &input.kind {
        InputKind::Table(layout) => {
            let rendered = flat::render(layout, &input_id, &values, &errors);
            emit_text(
                output_mode,
                &text::table_to_text(&rendered),
                &json!({ "input_id": input_id, "table": rendered }),
            )
        }
        InputKind::NestedTable(layout) => {
            let rendered = nested::render(layout, &input_id, &values, &errors);
            emit_text(
                output_mode,
                &text::grid_to_text(&rendered),
                &json!({ "input_id": input_id, "grid": rendered }),
            )
        }
        InputKind::MissingLayout(kind) => emit_text(
            output_mode,
            &format!("{}\n", text::MISSING_LAYOUT),
            &json!({ "input_id": input_id, "layout": kind, "placeholder": text::MISSING_LAYOUT }),
        ),
        InputKind::Scalar(_) => Err(CliError::usage(&format!(
            "input {input_id} is a scalar input, not a table"
        ))),
    }
}

pub(crate) fn run_evaluate(args: &EvaluateArgs, output_mode: OutputMode) -> Result<(), CliError> {
    let expectation = Expectation {
        expected_type: args.expected_type.into(),
        expected_min: args.min,
        expected_max: args.max,
        expected_value: args.expected,
    };
    let raw = match args.value_type {
        ValueTypeCli::Boolean => match args.value.trim() {
            "true" | "yes" => RawValue::Boolean(true),
            "false" | "no" => RawValue::Boolean(false),
            other => RawValue::text(other),
        },
        ValueTypeCli::Number | ValueTypeCli::Text => RawValue::text(&args.value),
    };
    let verdict = evaluate(
        &expectation,
        args.value_type.into(),
        args.unit.as_deref(),
        &raw,
    );
    let line = match &verdict {
        Some(v) if v.passed() => format!("pass: {}\n", v.message),
        Some(v) => format!("fail: {}\n", v.message),
        None => "no verdict\n".to_string(),
    };
    emit_text(output_mode, &line, &json!({ "verdict": verdict }))
}

async fn open_session(
    config: &CommtestConfig,
    test_id: &TestId,
    options: OpenOptions,
) -> Result<ResultSession, CliError> {
    let backend: Arc<dyn TestBackend> = Arc::new(open_backend(config));
    ResultSession::open(backend, test_id, options)
        .await
        .map_err(engine_error)
}

fn session_report(session: &ResultSession) -> Vec<Value> {
    session
        .fields()
        .iter()
        .map(|field| {
            json!({
                "field": field.key.to_string(),
                "label": field.label,
                "value": session.values().get(&field.key),
                "unit": field.unit,
                "verdict": session.verdict_for(&field.key),
            })
        })
        .collect()
}

fn invalid_session(session: &ResultSession) -> CliError {
    let mut err = CliError::validation("result is incomplete");
    for (key, msg) in session.errors() {
        err = err.with_detail(&key.to_string(), msg);
    }
    if let Some(msg) = session.asset_error() {
        err = err.with_detail("assets", msg);
    }
    err
}

pub(crate) fn run_result_command(
    command: ResultCommand,
    config: &CommtestConfig,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let rt = runtime()?;
    match command {
        ResultCommand::Submit {
            test_id,
            values,
            assets,
            locked_asset,
            result,
            draft,
            submitted_by,
        } => {
            let test_id: TestId = parse_id(&test_id)?;
            let entries: BTreeMap<String, Value> = read_json(&values)?;
            let assets = assets
                .iter()
                .map(|a| parse_id::<AssetId>(a))
                .collect::<Result<Vec<_>, _>>()?;
            let options = OpenOptions {
                locked_asset: parse_opt_id(locked_asset.as_deref())?,
                result_id: parse_opt_id(result.as_deref())?,
            };
            rt.block_on(async {
                let mut session = open_session(config, &test_id, options).await?;
                for (name, value) in &entries {
                    let key = session
                        .field_named(name)
                        .map(|f| f.key.clone())
                        .map_err(engine_error)?;
                    let raw = raw_value(value).ok_or_else(|| {
                        CliError::usage(&format!("field {name} must be a string, number or boolean"))
                    })?;
                    session.set_value(&key, raw).map_err(engine_error)?;
                }
                for asset in &assets {
                    let already = matches!(
                        session.assets(),
                        AssetSelection::Choice { selected, .. } if selected.contains(asset)
                    );
                    if !already {
                        session.toggle_asset(asset).map_err(engine_error)?;
                    }
                }
                debug!(fields = entries.len(), assets = assets.len(), "values applied");
                let status = if draft {
                    ResultStatus::Draft
                } else {
                    ResultStatus::Submitted
                };
                let saved = match session.submit(status, submitted_by).await {
                    Ok(saved) => saved,
                    Err(EngineError::Invalid { .. }) => return Err(invalid_session(&session)),
                    Err(err) => return Err(engine_error(err)),
                };
                let verdicts: Vec<Value> = session
                    .verdicts()
                    .into_iter()
                    .map(|(key, v)| json!({ "field": key.to_string(), "verdict": v }))
                    .collect();
                info!(result_id = %saved.id, verdicts = verdicts.len(), "result recorded");
                emit_ok(
                    output_mode,
                    &json!({
                        "command": "result submit",
                        "status": saved.status.as_str(),
                        "result_id": saved.id,
                        "responses": saved.responses.len(),
                        "verdicts": verdicts,
                    }),
                )
            })
        }
        ResultCommand::Show {
            test_id,
            asset,
            result,
        } => {
            let test_id: TestId = parse_id(&test_id)?;
            let options = OpenOptions {
                locked_asset: parse_opt_id(asset.as_deref())?,
                result_id: parse_opt_id(result.as_deref())?,
            };
            let session = rt.block_on(open_session(config, &test_id, options))?;
            emit_ok(
                output_mode,
                &json!({
                    "test_id": test_id,
                    "result_id": session.result_id(),
                    "fields": session_report(&session),
                }),
            )
        }
    }
}

pub(crate) fn run_catalog_command(
    command: CatalogCommand,
    config: &CommtestConfig,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let CatalogCommand::Import { jobs, assets } = command;
    if jobs.is_none() && assets.is_none() {
        return Err(CliError::usage("pass --jobs and/or --assets"));
    }
    let backend = open_backend(config);
    let rt = runtime()?;
    let mut imported = json!({ "command": "catalog import", "status": "ok" });
    if let Some(path) = jobs {
        let jobs: Vec<Job> = read_json(&path)?;
        rt.block_on(backend.import_jobs(&jobs)).map_err(store_error)?;
        imported["jobs"] = json!(jobs.len());
    }
    if let Some(path) = assets {
        let assets: Vec<Asset> = read_json(&path)?;
        rt.block_on(backend.import_assets(&assets))
            .map_err(store_error)?;
        imported["assets"] = json!(assets.len());
    }
    emit_ok(output_mode, &imported)
}

pub(crate) fn run_blob_command(
    command: BlobCommand,
    config: &CommtestConfig,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let store = open_blobs(config);
    let rt = runtime()?;
    let payload = match command {
        BlobCommand::Upload { path, file } => {
            let bytes = std::fs::read(&file).map_err(|e| {
                CliError::usage(&format!("failed to read {}: {e}", file.display()))
            })?;
            rt.block_on(store.upload(&path, &bytes)).map_err(store_error)?;
            json!({ "command": "blob upload", "path": path, "bytes": bytes.len() })
        }
        BlobCommand::Download { path, out } => {
            let bytes = rt.block_on(store.download(&path)).map_err(store_error)?;
            std::fs::write(&out, &bytes).map_err(CliError::internal)?;
            json!({ "command": "blob download", "path": path, "bytes": bytes.len() })
        }
        BlobCommand::Delete { path } => {
            rt.block_on(store.delete(&path)).map_err(store_error)?;
            json!({ "command": "blob delete", "path": path })
        }
        BlobCommand::Url { path } => {
            let url = store.public_url(&path).map_err(store_error)?;
            json!({ "command": "blob url", "path": path, "url": url })
        }
    };
    emit_ok(output_mode, &payload)
}
