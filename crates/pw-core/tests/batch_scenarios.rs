//! Batch evaluation scenarios against the JSON fixtures.

use chrono::NaiveDate;
use pw_common::CellId;
use pw_config::CostParameters;
use pw_core::batch::{
    evaluate_batch, BatchError, BatchOptions, BatchRequest, CellEvaluationError, RiskCell,
};
use pw_core::calibrate::{CalibrationError, CalibrationFactor};
use pw_core::decision::{recommend, utilities, Action};
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../test/fixtures/batch")
        .join(name)
}

fn load_request(name: &str) -> BatchRequest {
    let content = std::fs::read_to_string(fixture(name)).expect("read fixture");
    BatchRequest::parse_json(&content).expect("parse fixture")
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn half_probability_recommends_spraying() {
    let params = CostParameters::new(0.0, 868.0, 795.0, 48.0).unwrap();
    assert!(approx(params.treatment_cost(), 55.5));
    let u = utilities(0.5, &params);
    assert!(approx(u[1], 358.25));
    assert!(approx(u[2], 378.5));
    assert_eq!(recommend(0.5, &params), Action::Spraying);
}

#[test]
fn zero_probability_recommends_inaction() {
    let params = CostParameters::default();
    assert_eq!(utilities(0.0, &params), [0.0, -48.0, -55.5]);
    assert_eq!(recommend(0.0, &params), Action::Inaction);
}

#[test]
fn reference_sample_rescales_to_prevalence() {
    let factor = CalibrationFactor::from_reference(&[0.2, 0.3, 0.4], 0.11).unwrap();
    assert!((factor.factor() - 0.11 / 0.3).abs() < 1e-12);
    assert!((factor.apply(0.4) - 0.146_666_666_666_666_7).abs() < 1e-12);
}

#[test]
fn zero_mean_reference_is_calibration_error() {
    let request = BatchRequest {
        cells: vec![RiskCell {
            id: CellId::from("a"),
            slice: None,
            raw_probability: 0.3,
        }],
        reference_sample: vec![0.0, 0.0],
        target_prevalence: Some(0.11),
    };
    let err = evaluate_batch(&request, &CostParameters::default(), &BatchOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        BatchError::Calibration(CalibrationError::NonPositiveMean { .. })
    ));
}

#[test]
fn empty_reference_fixture_produces_no_results() {
    let request = load_request("empty_reference.json");
    let err = evaluate_batch(&request, &CostParameters::default(), &BatchOptions::default())
        .unwrap_err();
    assert_eq!(
        err,
        BatchError::Calibration(CalibrationError::EmptyReferenceSample)
    );
}

#[test]
fn small_request_summary_by_slice() {
    let request = load_request("small_request.json");
    let report =
        evaluate_batch(&request, &CostParameters::default(), &BatchOptions::default()).unwrap();

    assert_eq!(report.results.len(), 6);
    assert!(report.failures.is_empty());
    assert!(!report.is_partial());

    // Calibrated surface mean equals the target prevalence.
    let mean = report
        .results
        .iter()
        .map(|r| r.calibrated_probability)
        .sum::<f64>()
        / 6.0;
    assert!((mean - 0.11).abs() < 1e-12);

    let actions: Vec<Action> = report.results.iter().map(|r| r.recommended_action).collect();
    assert_eq!(
        actions,
        vec![
            Action::Inaction,
            Action::Inaction,
            Action::Spraying,
            Action::Inaction,
            Action::Monitoring,
            Action::Spraying,
        ]
    );

    let summary = &report.summary;
    assert_eq!(summary.action_counts.inaction, 3);
    assert_eq!(summary.action_counts.monitoring, 1);
    assert_eq!(summary.action_counts.spraying, 2);
    let first = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
    let second = NaiveDate::from_ymd_opt(2024, 7, 2).unwrap();
    assert_eq!(summary.slices[&first].action_counts.inaction, 2);
    assert_eq!(summary.slices[&first].action_counts.spraying, 1);
    assert_eq!(summary.slices[&second].action_counts.monitoring, 1);
    assert!(summary.max_evppi.unwrap() >= summary.mean_evppi.unwrap());
}

#[test]
fn partial_request_keeps_valid_cells() {
    let request = load_request("partial_request.json");
    let report =
        evaluate_batch(&request, &CostParameters::default(), &BatchOptions::default()).unwrap();

    assert!(report.is_partial());
    let ids: Vec<&str> = report.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["ok-1", "ok-2"]);
    assert_eq!(report.results[0].recommended_action, Action::Spraying);
    assert_eq!(report.results[1].recommended_action, Action::Inaction);

    let failed: Vec<&str> = report.failures.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(failed, vec!["bad-high", "bad-low"]);
    assert!(report
        .failures
        .iter()
        .all(|f| matches!(f.error, CellEvaluationError::ProbabilityOutOfRange { .. })));
    assert_eq!(report.summary.total_cells, 4);
}

#[test]
fn calibration_above_one_is_flagged_not_clamped() {
    let request = BatchRequest {
        cells: vec![RiskCell {
            id: CellId::from("hot"),
            slice: None,
            raw_probability: 0.9,
        }],
        reference_sample: vec![0.1],
        target_prevalence: Some(0.2),
    };
    let report =
        evaluate_batch(&request, &CostParameters::default(), &BatchOptions::default()).unwrap();
    let result = &report.results[0];
    assert!((result.calibrated_probability - 1.8).abs() < 1e-12);
    assert!(result.out_of_unit_interval);
    assert_eq!(report.summary.out_of_unit_interval, 1);
}

#[test]
fn parallel_matches_sequential() {
    let cells: Vec<RiskCell> = (0..5000)
        .map(|i| RiskCell {
            id: CellId::new(format!("c{i}")),
            slice: None,
            raw_probability: (i % 1000) as f64 / 1000.0,
        })
        .collect();
    let request = BatchRequest {
        cells,
        reference_sample: vec![0.2, 0.3, 0.4],
        target_prevalence: None,
    };
    let params = CostParameters::default();

    let sequential = evaluate_batch(
        &request,
        &params,
        &BatchOptions::default().with_max_workers(1),
    )
    .unwrap();
    let parallel = evaluate_batch(
        &request,
        &params,
        &BatchOptions::default()
            .with_max_workers(8)
            .with_parallel_threshold(0),
    )
    .unwrap();

    assert_eq!(sequential.results, parallel.results);
    assert_eq!(sequential.summary, parallel.summary);
}

#[test]
fn workspace_profiles_unwind_on_panic() {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../Cargo.toml");
    let content = std::fs::read_to_string(manifest).expect("read workspace manifest");
    let aborts = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .any(|line| line.replace(' ', "") == "panic=\"abort\"");
    assert!(!aborts, "worker panic recovery needs unwinding profiles");
}
