// SPDX-License-Identifier: Apache-2.0

use assert_cmd::Command;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, name: &str, value: &Value) -> String {
        let path = self.path().join(name);
        std::fs::write(&path, serde_json::to_vec(value).expect("encode")).expect("write");
        path.display().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("commtest").expect("commtest binary");
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join("config"))
            .env("COMMTEST_CONFIG", self.path().join("absent.toml"))
            .env("COMMTEST_DATA_DIR", self.path().join("data"))
            .env("COMMTEST_LOG_LEVEL", "error");
        cmd
    }

    fn run_json(&self, args: &[&str]) -> Value {
        let output = self.cmd().arg("--json").args(args).output().expect("run");
        assert!(
            output.status.success(),
            "{args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("json stdout")
    }
}

fn insulation_draft() -> Value {
    json!({
        "name": "Insulation Resistance",
        "job_id": "job-1",
        "asset_type": "switchboard",
        "inputs": [{
            "label": "Phase to earth",
            "input_type": "number",
            "unit": "MΩ",
            "expected_type": "minimum",
            "expected_min": 1
        }]
    })
}

#[test]
fn invalid_draft_exits_with_validation_code_and_field_details() {
    let sandbox = Sandbox::new();
    let draft = sandbox.write("draft.json", &json!({ "name": "", "inputs": [] }));
    let output = sandbox
        .cmd()
        .args(["--json", "test", "validate", &draft])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(3));
    let machine: Value = serde_json::from_slice(&output.stderr).expect("machine error");
    assert_eq!(machine["code"], "validation_error");
    assert_eq!(machine["details"]["name"], "Enter a test name");
    assert_eq!(machine["details"]["job_id"], "Select a job");
}

#[test]
fn validate_reports_a_stable_draft_fingerprint() {
    let sandbox = Sandbox::new();
    let draft = sandbox.write("draft.json", &insulation_draft());
    let first = sandbox.run_json(&["test", "validate", &draft]);
    let second = sandbox.run_json(&["test", "validate", &draft]);
    assert_eq!(first["status"], "ok");
    assert_eq!(first["inputs"], 1);
    let fingerprint = first["fingerprint"].as_str().expect("fingerprint");
    assert_eq!(fingerprint.len(), 64);
    assert_eq!(second["fingerprint"], first["fingerprint"]);
}

#[test]
fn insulation_resistance_workflow() {
    let sandbox = Sandbox::new();
    let draft = sandbox.write("draft.json", &insulation_draft());
    let assets = sandbox.write(
        "assets.json",
        &json!([
            { "id": "msb-1", "name": "Main switchboard", "asset_type": "switchboard", "job_id": "job-1" },
            { "id": "gen-1", "name": "Generator", "asset_type": "generator", "job_id": "job-1" }
        ]),
    );
    sandbox.run_json(&["catalog", "import", "--assets", &assets]);

    let created = sandbox.run_json(&["test", "create", &draft]);
    let test_id = created["test_id"].as_str().expect("test id").to_string();
    let shown = sandbox.run_json(&["test", "show", &test_id]);
    assert_eq!(shown["summary"]["scalar_inputs"], 1);
    let input_id = shown["test"]["inputs"][0]["id"]
        .as_str()
        .expect("input id")
        .to_string();

    let empty = sandbox.write("empty.json", &json!({ input_id.clone(): "" }));
    let output = sandbox
        .cmd()
        .args(["--json", "result", "submit", &test_id, "--values", &empty])
        .args(["--asset", "msb-1"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(3));
    let machine: Value = serde_json::from_slice(&output.stderr).expect("machine error");
    assert_eq!(machine["details"][input_id.as_str()], "Enter a value");
    assert!(!sandbox.path().join("data/results").exists());

    let filled = sandbox.write("filled.json", &json!({ input_id.clone(): "0.5" }));
    let saved = sandbox.run_json(&[
        "result",
        "submit",
        &test_id,
        "--values",
        &filled,
        "--asset",
        "msb-1",
    ]);
    assert_eq!(saved["status"], "submitted");
    assert_eq!(saved["responses"], 1);
    assert_eq!(saved["verdicts"][0]["verdict"]["outcome"], "fail");
    assert_eq!(saved["verdicts"][0]["verdict"]["message"], "Expected ≥ 1 MΩ");

    let shown = sandbox.run_json(&["result", "show", &test_id, "--asset", "msb-1"]);
    assert_eq!(shown["result_id"], saved["result_id"]);
    assert_eq!(shown["fields"][0]["value"], "0.5");
}

#[test]
fn table_layout_renders_saved_values_as_text() {
    let sandbox = Sandbox::new();
    let draft = sandbox.write(
        "draft.json",
        &json!({
            "name": "Phase readings",
            "job_id": "job-1",
            "inputs": [{
                "label": "Readings",
                "input_type": "table",
                "table_layout": {
                    "rows": ["L1", "L2"],
                    "columns": ["Volts"],
                    "cells": [
                        { "rowIndex": 0, "columnIndex": 0, "enabled": true, "inputType": "number" },
                        { "rowIndex": 1, "columnIndex": 0, "enabled": false, "inputType": "number" }
                    ]
                }
            }]
        }),
    );
    let test_id = sandbox.run_json(&["test", "create", &draft])["test_id"]
        .as_str()
        .expect("test id")
        .to_string();
    let input_id = sandbox.run_json(&["test", "show", &test_id])["test"]["inputs"][0]["id"]
        .as_str()
        .expect("input id")
        .to_string();
    let values = sandbox.write("values.json", &json!({ format!("{input_id}_0_0"): "231" }));
    let saved = sandbox.run_json(&[
        "result",
        "submit",
        &test_id,
        "--values",
        &values,
        "--locked-asset",
        "msb-1",
    ]);
    let result_id = saved["result_id"].as_str().expect("result id").to_string();

    let output = sandbox
        .cmd()
        .args(["layout", "render", &test_id, &input_id, "--result", &result_id])
        .output()
        .expect("run");
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).expect("utf8");
    assert!(text.contains("L1 | 231"), "{text}");
    assert!(text.contains("L2 | N/A"), "{text}");
}

#[test]
fn blob_paths_cannot_escape_the_store() {
    let sandbox = Sandbox::new();
    let file = sandbox.write("photo.json", &json!({ "jpeg": false }));
    let output = sandbox
        .cmd()
        .args(["--json", "blob", "upload", "../escape", &file])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(3));

    sandbox.run_json(&["blob", "upload", "job-1/photo.json", &file]);
    assert!(sandbox.path().join("data/blobs/job-1/photo.json").exists());
}
