// SPDX-License-Identifier: Apache-2.0

use assert_cmd::Command;

fn parse_commands_from_help(text: &str) -> Vec<String> {
    let mut commands = Vec::new();
    let mut in_commands = false;
    for line in text.lines() {
        let trimmed = line.trim_end();
        if trimmed == "Commands:" {
            in_commands = true;
            continue;
        }
        if in_commands {
            if trimmed.is_empty() {
                break;
            }
            let name = trimmed.split_whitespace().next().unwrap_or("");
            if !name.is_empty() && name != "help" {
                commands.push(name.to_string());
            }
        }
    }
    commands.sort();
    commands
}

fn commtest() -> Command {
    Command::cargo_bin("commtest").expect("commtest binary")
}

#[test]
fn help_command_surface_is_stable() {
    let output = commtest().arg("--help").output().expect("run help");
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).expect("utf8 help");
    assert_eq!(
        parse_commands_from_help(&text),
        vec![
            "blob",
            "catalog",
            "completion",
            "evaluate",
            "layout",
            "result",
            "test",
        ]
    );
    assert!(text.contains("COMMTEST_DATA_DIR"));
}

#[test]
fn version_output_contains_crate_version() {
    let output = commtest().arg("--version").output().expect("run version");
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).expect("utf8 version output");
    assert!(text.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_flag_returns_usage_exit_code_with_machine_error() {
    let output = commtest()
        .args(["--json", "--unknown-flag"])
        .output()
        .expect("run bad cli");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("utf8 stderr");
    let machine: serde_json::Value = serde_json::from_str(stderr.trim()).expect("machine error");
    assert_eq!(machine["code"], "usage_error");
}

#[test]
fn print_config_paths_is_machine_readable() {
    let output = commtest()
        .args(["--json", "--print-config-paths"])
        .output()
        .expect("run config paths");
    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert!(payload.get("user_config").is_some());
    assert_eq!(payload["workspace_config"], ".commtest/config.toml");
}

#[test]
fn completion_script_names_the_binary() {
    let output = commtest()
        .args(["completion", "bash"])
        .output()
        .expect("run completion");
    assert!(output.status.success());
    let script = String::from_utf8(output.stdout).expect("utf8 script");
    assert!(script.contains("commtest"));
}

#[test]
fn evaluate_reports_the_advisory_verdict() {
    let output = commtest()
        .args([
            "--json",
            "evaluate",
            "--expected-type",
            "minimum",
            "--min",
            "1",
            "--unit",
            "MΩ",
            "0.5",
        ])
        .env("COMMTEST_LOG_LEVEL", "error")
        .output()
        .expect("run evaluate");
    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(payload["verdict"]["outcome"], "fail");
    assert_eq!(payload["verdict"]["message"], "Expected ≥ 1 MΩ");

    let blank = commtest()
        .args(["evaluate", "--expected-type", "range", "--min", "10", "--max", "20", ""])
        .env("COMMTEST_LOG_LEVEL", "error")
        .output()
        .expect("run evaluate");
    assert!(blank.status.success());
    assert_eq!(String::from_utf8_lossy(&blank.stdout), "no verdict\n");
}
