//! End-to-end CLI tests for pw-core.
//!
//! Every command runs with an empty HOME and XDG config dir so the host's
//! configuration never leaks in.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../test/fixtures")
}

fn batch_fixture(name: &str) -> PathBuf {
    fixtures().join("batch").join(name)
}

fn config_fixture(name: &str) -> PathBuf {
    fixtures().join("config").join(name)
}

/// pw-core with an isolated environment.
fn pw_core(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("pw-core");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("PEST_WARNING_COSTS")
        .env_remove("PEST_WARNING_CALIBRATION")
        .env_remove("PEST_WARNING_CONFIG_DIR")
        .env("PW_LOG", "error");
    cmd
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ============================================================================
// evaluate
// ============================================================================

mod evaluate {
    use super::*;

    #[test]
    fn clean_batch_exits_zero() {
        let home = TempDir::new().unwrap();
        let output = pw_core(&home)
            .args(["evaluate", "--input"])
            .arg(batch_fixture("small_request.json"))
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(0));

        let json = stdout_json(&output);
        assert!(json["batch_id"].as_str().unwrap().starts_with("pw-"));
        assert!(json["run_id"].as_str().unwrap().starts_with("run-"));
        assert_eq!(json["report"]["summary"]["evaluated"], 6);
        assert_eq!(json["report"]["summary"]["action_counts"]["spraying"], 2);
        assert_eq!(json["report"]["summary"]["units"], "INR/ha/annum");
        assert_eq!(json["config"]["costs_source"], "builtin default");
        assert!(json["report"]["summary"]["slices"]["2024-07-01"].is_object());
    }

    #[test]
    fn partial_batch_exits_one() {
        let home = TempDir::new().unwrap();
        let output = pw_core(&home)
            .args(["evaluate", "--input"])
            .arg(batch_fixture("partial_request.json"))
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(1));

        let json = stdout_json(&output);
        assert_eq!(json["report"]["failures"].as_array().unwrap().len(), 2);
        assert_eq!(json["report"]["failures"][0]["id"], "bad-high");
        assert_eq!(
            json["report"]["failures"][0]["error"]["kind"],
            "probability_out_of_range"
        );
    }

    #[test]
    fn empty_reference_is_calibration_exit() {
        let home = TempDir::new().unwrap();
        pw_core(&home)
            .args(["evaluate", "--input"])
            .arg(batch_fixture("empty_reference.json"))
            .assert()
            .code(12)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains(r#""category":"calibration""#));
    }

    #[test]
    fn reads_request_from_stdin() {
        let home = TempDir::new().unwrap();
        let body = std::fs::read_to_string(batch_fixture("partial_request.json")).unwrap();
        pw_core(&home)
            .args(["--format", "summary", "evaluate", "--input", "-"])
            .write_stdin(body)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("4 cells, 2 evaluated, 2 failed"));
    }

    #[test]
    fn custom_costs_change_recommendations() {
        let home = TempDir::new().unwrap();
        let output = pw_core(&home)
            .arg("--costs")
            .arg(config_fixture("custom_costs.json"))
            .args(["evaluate", "--workers", "2", "--input"])
            .arg(batch_fixture("partial_request.json"))
            .output()
            .unwrap();
        let json = stdout_json(&output);
        assert_eq!(json["config"]["costs_source"], "CLI argument");
        assert_eq!(json["report"]["summary"]["units"], "USD/acre/season");
        assert!(json["config"]["costs_hash"].is_string());
    }

    #[test]
    fn invalid_costs_is_config_exit() {
        let home = TempDir::new().unwrap();
        pw_core(&home)
            .arg("--costs")
            .arg(config_fixture("invalid_costs_monotone.json"))
            .args(["evaluate", "--input"])
            .arg(batch_fixture("small_request.json"))
            .assert()
            .code(11)
            .stderr(predicate::str::contains(r#""code":11"#));
    }

    #[test]
    fn missing_input_is_io_exit() {
        let home = TempDir::new().unwrap();
        pw_core(&home)
            .args(["--format", "md", "evaluate", "--input"])
            .arg(home.path().join("absent.json"))
            .assert()
            .code(21)
            .stderr(predicate::str::contains("I/O Error"));
    }

    #[test]
    fn malformed_request_is_args_exit() {
        let home = TempDir::new().unwrap();
        pw_core(&home)
            .args(["evaluate", "--input", "-"])
            .write_stdin("{\"cells\": 3}")
            .assert()
            .code(10)
            .stderr(predicate::str::contains("invalid batch request"));
    }

    const HOT_REQUEST: &str = r#"{
        "cells": [
            {"id": "hot-cell", "raw_probability": 0.9},
            {"id": "cool-cell", "raw_probability": 0.01}
        ],
        "reference_sample": [0.05]
    }"#;

    fn jsonl_warn(cmd: &mut Command) -> &mut Command {
        cmd.env("PW_LOG", "warn")
            .env("PW_LOG_FORMAT", "jsonl")
            .env_remove("RUST_LOG")
    }

    #[test]
    fn out_of_range_cells_are_logged() {
        let home = TempDir::new().unwrap();
        let output = jsonl_warn(&mut pw_core(&home))
            .args(["evaluate", "--input", "-"])
            .write_stdin(HOT_REQUEST)
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(0));
        assert_eq!(stdout_json(&output)["report"]["summary"]["out_of_unit_interval"], 1);

        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<serde_json::Value> = stderr
            .lines()
            .filter(|line| line.contains("calibrate.out_of_range"))
            .map(|line| serde_json::from_str(line).expect("JSONL log line"))
            .collect();
        assert_eq!(lines.len(), 1, "stderr: {stderr}");
        assert_eq!(lines[0]["event"], "calibrate.out_of_range");
        assert_eq!(lines[0]["fields"]["cell_id"], "hot-cell");
        let calibrated = lines[0]["fields"]["calibrated_probability"].as_f64().unwrap();
        assert!((calibrated - 1.98).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_warning_can_be_silenced() {
        let home = TempDir::new().unwrap();
        let calibration = home.path().join("quiet-calibration.json");
        std::fs::write(
            &calibration,
            r#"{"target_prevalence": 0.11, "warn_out_of_unit_interval": false}"#,
        )
        .unwrap();

        let output = jsonl_warn(&mut pw_core(&home))
            .arg("--calibration")
            .arg(&calibration)
            .args(["evaluate", "--input", "-"])
            .write_stdin(HOT_REQUEST)
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(0));
        assert_eq!(stdout_json(&output)["report"]["summary"]["out_of_unit_interval"], 1);

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(!stderr.contains("calibrate.out_of_range"), "stderr: {stderr}");
    }

    #[test]
    fn rust_log_directives_replace_pw_log_level() {
        let home = TempDir::new().unwrap();
        let output = pw_core(&home)
            .env("PW_LOG_FORMAT", "jsonl")
            .env("RUST_LOG", "warn")
            .args(["evaluate", "--input", "-"])
            .write_stdin(HOT_REQUEST)
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(0));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("\"event\":\"calibrate.out_of_range\""), "stderr: {stderr}");
    }

    #[test]
    fn markdown_report_has_slices() {
        let home = TempDir::new().unwrap();
        pw_core(&home)
            .args(["--format", "md", "evaluate", "--input"])
            .arg(batch_fixture("small_request.json"))
            .assert()
            .success()
            .stdout(predicate::str::contains("## Slices"))
            .stdout(predicate::str::contains("| 2024-07-02 |"));
    }
}

// ============================================================================
// explain / thresholds
// ============================================================================

mod decision {
    use super::*;

    #[test]
    fn explain_prints_ledger() {
        let home = TempDir::new().unwrap();
        let output = pw_core(&home)
            .args(["explain", "--probability", "0.1"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let json = stdout_json(&output);
        assert_eq!(json["recommended_action"], "monitoring");
        assert!((json["evppi"]["evppi"].as_f64().unwrap() - 49.95).abs() < 1e-9);
        assert_eq!(json["branches"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn explain_rejects_nan() {
        let home = TempDir::new().unwrap();
        pw_core(&home)
            .args(["explain", "--probability", "NaN"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("finite"));
    }

    #[test]
    fn thresholds_list_bands() {
        let home = TempDir::new().unwrap();
        let output = pw_core(&home).arg("thresholds").output().unwrap();
        assert!(output.status.success());
        let json = stdout_json(&output);
        let bands = json["bands"].as_array().unwrap();
        assert_eq!(bands.len(), 3);
        assert_eq!(bands[0]["action"], "inaction");
        assert_eq!(bands[2]["action"], "spraying");
        let im = json["thresholds"]["inaction_monitoring"].as_f64().unwrap();
        assert!((im - 48.0 / 812.5).abs() < 1e-12);
    }
}

// ============================================================================
// check / config
// ============================================================================

mod config {
    use super::*;

    #[test]
    fn check_defaults_ok() {
        let home = TempDir::new().unwrap();
        let output = pw_core(&home).arg("check").output().unwrap();
        assert!(output.status.success());
        let json = stdout_json(&output);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["checks"][0]["using_defaults"], true);
    }

    #[test]
    fn check_reports_broken_calibration() {
        let home = TempDir::new().unwrap();
        let output = pw_core(&home)
            .arg("--calibration")
            .arg(config_fixture("invalid_calibration.json"))
            .arg("check")
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(11));
        let json = stdout_json(&output);
        assert_eq!(json["checks"][0]["status"], "ok");
        assert_eq!(json["checks"][1]["status"], "error");
        assert_eq!(json["checks"][1]["code"], 16);
    }

    #[test]
    fn config_dir_is_searched() {
        let home = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        std::fs::copy(
            config_fixture("custom_costs.json"),
            dir.path().join("costs.json"),
        )
        .unwrap();
        let output = pw_core(&home)
            .arg("--config-dir")
            .arg(dir.path())
            .args(["config", "show"])
            .output()
            .unwrap();
        let json = stdout_json(&output);
        assert_eq!(json["treatment_cost"], 10.0);
        assert_eq!(json["snapshot"]["costs_source"], "CLI config dir");
    }

    #[test]
    fn validate_guesses_calibration_by_name() {
        let home = TempDir::new().unwrap();
        pw_core(&home)
            .args(["config", "validate"])
            .arg(config_fixture("valid_calibration.json"))
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""status": "valid""#));
    }

    #[test]
    fn validate_version_mismatch_fails() {
        let home = TempDir::new().unwrap();
        pw_core(&home)
            .args(["config", "validate"])
            .arg(config_fixture("invalid_costs_version.json"))
            .assert()
            .code(11);
    }

    #[test]
    fn schema_for_request() {
        let home = TempDir::new().unwrap();
        pw_core(&home)
            .args(["config", "schema", "--file", "request"])
            .assert()
            .success()
            .stdout(predicate::str::contains("reference_sample"));
    }

    #[test]
    fn unknown_schema_is_args_error() {
        let home = TempDir::new().unwrap();
        pw_core(&home)
            .args(["config", "schema", "--file", "priors"])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("available: costs"));
    }

    #[test]
    fn version_reports_schema() {
        let home = TempDir::new().unwrap();
        pw_core(&home)
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::contains("schema_version"));
    }
}
