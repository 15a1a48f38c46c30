use crate::{CliError, OutputMode};
use commtest_core::{canonical, CommtestConfig};
use commtest_layout::RawValue;
use commtest_store::{LocalBlobStore, LocalFsBackend, StoreError, StoreErrorCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::str::FromStr;

pub(crate) fn emit_ok(output_mode: OutputMode, payload: &Value) -> Result<(), CliError> {
    if output_mode.json {
        let bytes = canonical::document_bytes(payload).map_err(CliError::internal)?;
        let text = String::from_utf8(bytes).map_err(CliError::internal)?;
        println!("{text}");
    } else {
        println!(
            "{}",
            serde_json::to_string_pretty(payload).map_err(CliError::internal)?
        );
    }
    Ok(())
}

pub(crate) fn emit_text(output_mode: OutputMode, text: &str, payload: &Value) -> Result<(), CliError> {
    if output_mode.json {
        emit_ok(output_mode, payload)
    } else {
        print!("{text}");
        Ok(())
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        CliError::usage(&format!("failed to read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        CliError::validation(&format!("invalid JSON in {}: {e}", path.display()))
    })
}

pub(crate) fn parse_id<T>(raw: &str) -> Result<T, CliError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| CliError::usage(&e.to_string()))
}

pub(crate) fn parse_opt_id<T>(raw: Option<&str>) -> Result<Option<T>, CliError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(parse_id).transpose()
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::internal)
}

pub(crate) fn open_backend(config: &CommtestConfig) -> LocalFsBackend {
    LocalFsBackend::new(config.data_dir())
}

pub(crate) fn open_blobs(config: &CommtestConfig) -> LocalBlobStore {
    LocalBlobStore::new(
        config.data_dir().join("blobs"),
        config.public_url_base.clone(),
    )
}

/// Values file entries as typed by an operator: strings as entered,
/// numbers as their decimal text and booleans as checkboxes.
pub(crate) fn raw_value(value: &Value) -> Option<RawValue> {
    match value {
        Value::Bool(b) => Some(RawValue::Boolean(*b)),
        Value::String(s) => Some(RawValue::text(s)),
        Value::Number(n) => Some(RawValue::text(&n.to_string())),
        Value::Null => Some(RawValue::text("")),
        Value::Array(_) | Value::Object(_) => None,
    }
}

pub(crate) fn store_error(err: StoreError) -> CliError {
    match err.code {
        StoreErrorCode::NotFound | StoreErrorCode::Validation | StoreErrorCode::Conflict => {
            CliError::validation(&err.to_string()).with_detail("store_code", err.code.as_str())
        }
        _ => CliError::dependency(&err.to_string()).with_detail("store_code", err.code.as_str()),
    }
}
