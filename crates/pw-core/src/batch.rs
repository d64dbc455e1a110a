//! Batch evaluation of a probability surface.
//!
//! One batch is one calibration factor, one [`CostParameters`], and any
//! number of (cell, slice) probabilities. Malformed cells are reported
//! individually and excluded; everything else is evaluated in a fan-out over
//! scoped worker threads with no shared mutable state.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::thread;

use chrono::NaiveDate;
use pw_common::CellId;
use pw_config::{CalibrationConfig, ConfigurationError, CostParameters};
use pw_math::{is_unit_interval, stable_mean};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calibrate::{CalibrationError, CalibrationFactor};
use crate::decision::{evppi, recommend, utilities, Action};
use crate::log_event;
use crate::logging::{event_names, LogContext, Stage};

/// Below this many valid cells evaluation stays on the calling thread.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 1024;

/// One spatial unit at one time slice, as produced by the upstream model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RiskCell {
    pub id: CellId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice: Option<NaiveDate>,
    pub raw_probability: f64,
}

/// A cell after calibration.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct CalibratedCell {
    pub id: CellId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice: Option<NaiveDate>,
    pub calibrated_probability: f64,
}

/// Input to [`evaluate_batch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchRequest {
    pub cells: Vec<RiskCell>,
    /// Raw probabilities whose mean is rescaled to the target prevalence.
    pub reference_sample: Vec<f64>,
    /// Overrides the configured target prevalence for this batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_prevalence: Option<f64>,
}

impl BatchRequest {
    /// Parse a request from JSON.
    pub fn parse_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Tuning for one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    pub max_workers: usize,
    pub parallel_threshold: usize,
    /// Used when the request carries no target prevalence.
    pub target_prevalence: f64,
    pub warn_out_of_unit_interval: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from_calibration(&CalibrationConfig::default())
    }
}

impl BatchOptions {
    pub fn from_calibration(calibration: &CalibrationConfig) -> Self {
        BatchOptions {
            max_workers: default_max_workers(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            target_prevalence: calibration.target_prevalence,
            warn_out_of_unit_interval: calibration.warn_out_of_unit_interval,
        }
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}

fn default_max_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Decision outputs for one evaluated cell.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct DecisionResult {
    pub id: CellId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice: Option<NaiveDate>,
    pub calibrated_probability: f64,
    pub evppi: f64,
    /// Ordered inaction, monitoring, spraying.
    pub utility_by_action: [f64; 3],
    pub recommended_action: Action,
    pub out_of_unit_interval: bool,
}

/// Why a single cell was excluded.
#[derive(Debug, Clone, PartialEq, Error, Serialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CellEvaluationError {
    #[error("raw probability is not finite ({value})")]
    NonFiniteProbability { value: f64 },

    #[error("raw probability {value} is outside [0, 1]")]
    ProbabilityOutOfRange { value: f64 },

    #[error("worker panicked")]
    WorkerPanicked,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct CellFailure {
    pub id: CellId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice: Option<NaiveDate>,
    pub reason: String,
    pub error: CellEvaluationError,
}

impl CellFailure {
    fn new(id: CellId, slice: Option<NaiveDate>, error: CellEvaluationError) -> Self {
        CellFailure {
            id,
            slice,
            reason: error.to_string(),
            error,
        }
    }
}

/// Batch-fatal errors. No results are produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatchError {
    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl From<CalibrationError> for pw_common::Error {
    fn from(err: CalibrationError) -> Self {
        pw_common::Error::Calibration(err.to_string())
    }
}

impl From<BatchError> for pw_common::Error {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::Calibration(err) => err.into(),
            // Only the request's target prevalence override reaches here.
            BatchError::Configuration(err) => pw_common::Error::InvalidRequest(err.to_string()),
        }
    }
}

impl From<&CellFailure> for pw_common::Error {
    fn from(failure: &CellFailure) -> Self {
        pw_common::Error::CellEvaluation {
            cell_id: failure.id.to_string(),
            reason: failure.reason.clone(),
        }
    }
}

/// Recommendation tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ActionCounts {
    pub inaction: usize,
    pub monitoring: usize,
    pub spraying: usize,
}

impl ActionCounts {
    fn record(&mut self, action: Action) {
        match action {
            Action::Inaction => self.inaction += 1,
            Action::Monitoring => self.monitoring += 1,
            Action::Spraying => self.spraying += 1,
        }
    }

    pub fn get(&self, action: Action) -> usize {
        match action {
            Action::Inaction => self.inaction,
            Action::Monitoring => self.monitoring,
            Action::Spraying => self.spraying,
        }
    }

    pub fn total(&self) -> usize {
        self.inaction + self.monitoring + self.spraying
    }
}

/// Aggregate figures for one time slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, JsonSchema)]
pub struct SliceSummary {
    pub evaluated: usize,
    pub failed: usize,
    pub out_of_unit_interval: usize,
    pub action_counts: ActionCounts,
    pub mean_evppi: Option<f64>,
    pub max_evppi: Option<f64>,
}

/// Aggregate figures for a whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct BatchSummary {
    pub total_cells: usize,
    pub evaluated: usize,
    pub failed: usize,
    pub out_of_unit_interval: usize,
    pub action_counts: ActionCounts,
    pub mean_evppi: Option<f64>,
    pub max_evppi: Option<f64>,
    /// Units every monetary output is expressed in.
    pub units: String,
    /// Per-date figures; undated cells only appear in the batch totals.
    pub slices: BTreeMap<NaiveDate, SliceSummary>,
}

#[derive(Debug, Default)]
struct Tally {
    failed: usize,
    out_of_unit_interval: usize,
    action_counts: ActionCounts,
    evppi: Vec<f64>,
}

impl Tally {
    fn record(&mut self, result: &DecisionResult) {
        self.action_counts.record(result.recommended_action);
        if result.out_of_unit_interval {
            self.out_of_unit_interval += 1;
        }
        self.evppi.push(result.evppi);
    }

    fn mean_evppi(&self) -> Option<f64> {
        stable_mean(&self.evppi)
    }

    fn max_evppi(&self) -> Option<f64> {
        self.evppi.iter().copied().reduce(f64::max)
    }

    fn into_slice(self) -> SliceSummary {
        SliceSummary {
            evaluated: self.evppi.len(),
            failed: self.failed,
            out_of_unit_interval: self.out_of_unit_interval,
            action_counts: self.action_counts,
            mean_evppi: self.mean_evppi(),
            max_evppi: self.max_evppi(),
        }
    }
}

impl BatchSummary {
    pub fn from_outcome(
        results: &[DecisionResult],
        failures: &[CellFailure],
        params: &CostParameters,
    ) -> Self {
        let mut total = Tally::default();
        let mut slices: BTreeMap<NaiveDate, Tally> = BTreeMap::new();

        for result in results {
            total.record(result);
            if let Some(date) = result.slice {
                slices.entry(date).or_default().record(result);
            }
        }
        for failure in failures {
            total.failed += 1;
            if let Some(date) = failure.slice {
                slices.entry(date).or_default().failed += 1;
            }
        }

        BatchSummary {
            total_cells: results.len() + failures.len(),
            evaluated: results.len(),
            failed: total.failed,
            out_of_unit_interval: total.out_of_unit_interval,
            action_counts: total.action_counts,
            mean_evppi: total.mean_evppi(),
            max_evppi: total.max_evppi(),
            units: params.units().to_string(),
            slices: slices
                .into_iter()
                .map(|(date, tally)| (date, tally.into_slice()))
                .collect(),
        }
    }
}

/// Everything one batch produced.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct BatchReport {
    /// Evaluated cells, in input order.
    pub results: Vec<DecisionResult>,
    pub failures: Vec<CellFailure>,
    pub summary: BatchSummary,
    pub calibration: CalibrationFactor,
}

impl BatchReport {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Check a raw probability before calibration.
pub fn validate_cell(cell: &RiskCell) -> Result<f64, CellEvaluationError> {
    let p = cell.raw_probability;
    if !p.is_finite() {
        return Err(CellEvaluationError::NonFiniteProbability { value: p });
    }
    if !is_unit_interval(p) {
        return Err(CellEvaluationError::ProbabilityOutOfRange { value: p });
    }
    Ok(p)
}

/// Evaluate the decision core for one calibrated cell.
pub fn evaluate_cell(cell: &CalibratedCell, params: &CostParameters) -> DecisionResult {
    let p = cell.calibrated_probability;
    let utility_by_action = utilities(p, params);
    DecisionResult {
        id: cell.id.clone(),
        slice: cell.slice,
        calibrated_probability: p,
        evppi: evppi(p, params),
        utility_by_action,
        recommended_action: recommend(p, params),
        out_of_unit_interval: !is_unit_interval(p),
    }
}

/// Evaluate a batch without log correlation ids.
pub fn evaluate_batch(
    request: &BatchRequest,
    params: &CostParameters,
    options: &BatchOptions,
) -> Result<BatchReport, BatchError> {
    evaluate_batch_with_context(request, params, options, &LogContext::detached())
}

/// Evaluate every cell of a request.
///
/// Fails as a whole only when the calibration factor cannot be built or the
/// request's target prevalence override is invalid.
pub fn evaluate_batch_with_context(
    request: &BatchRequest,
    params: &CostParameters,
    options: &BatchOptions,
    ctx: &LogContext,
) -> Result<BatchReport, BatchError> {
    log_event!(
        ctx,
        INFO,
        event_names::BATCH_STARTED,
        Stage::Init,
        "Starting batch evaluation",
        cells = request.cells.len(),
        reference_len = request.reference_sample.len()
    );

    let factor = match build_factor(request, options) {
        Ok(factor) => factor,
        Err(err) => {
            let reason = err.to_string();
            log_event!(
                ctx,
                ERROR,
                event_names::BATCH_ABORTED,
                Stage::Calibrate,
                "Batch aborted before evaluation",
                error = reason.as_str()
            );
            return Err(err);
        }
    };
    log_event!(
        ctx,
        INFO,
        event_names::CALIBRATE_FACTOR,
        Stage::Calibrate,
        "Calibration factor built",
        factor = factor.factor(),
        reference_mean = factor.reference_mean(),
        target_prevalence = factor.target_prevalence()
    );

    let mut failures = Vec::new();
    let mut calibrated = Vec::with_capacity(request.cells.len());
    for cell in &request.cells {
        match validate_cell(cell) {
            Ok(raw) => calibrated.push(CalibratedCell {
                id: cell.id.clone(),
                slice: cell.slice,
                calibrated_probability: factor.apply(raw),
            }),
            Err(err) => failures.push(CellFailure::new(cell.id.clone(), cell.slice, err)),
        }
    }

    let workers = effective_workers(calibrated.len(), options);
    log_event!(
        ctx,
        DEBUG,
        event_names::EVALUATE_STARTED,
        Stage::Evaluate,
        "Evaluating cells",
        valid = calibrated.len(),
        workers = workers
    );

    let mut results = Vec::with_capacity(calibrated.len());
    for chunk in fan_out(&calibrated, workers, |cell| evaluate_cell(cell, params)) {
        match chunk {
            Ok(chunk_results) => results.extend(chunk_results),
            Err(cells) => failures.extend(cells.iter().map(|cell| {
                CellFailure::new(
                    cell.id.clone(),
                    cell.slice,
                    CellEvaluationError::WorkerPanicked,
                )
            })),
        }
    }

    log_event!(
        ctx,
        DEBUG,
        event_names::EVALUATE_FINISHED,
        Stage::Evaluate,
        "Cells evaluated",
        results = results.len(),
        failures = failures.len()
    );

    for failure in &failures {
        log_event!(
            ctx,
            WARN,
            event_names::EVALUATE_CELL_FAILED,
            Stage::Evaluate,
            "Cell excluded from batch",
            cell_id = failure.id.as_str(),
            reason = failure.reason.as_str()
        );
    }
    if options.warn_out_of_unit_interval {
        for result in results.iter().filter(|r| r.out_of_unit_interval) {
            log_event!(
                ctx,
                WARN,
                event_names::CALIBRATE_OUT_OF_RANGE,
                Stage::Calibrate,
                "Calibrated probability outside [0, 1]; results are unclipped",
                cell_id = result.id.as_str(),
                calibrated_probability = result.calibrated_probability
            );
        }
    }

    let summary = BatchSummary::from_outcome(&results, &failures, params);
    log_event!(
        ctx,
        DEBUG,
        event_names::AGGREGATE_SUMMARY,
        Stage::Aggregate,
        "Summary built",
        slices = summary.slices.len(),
        out_of_unit_interval = summary.out_of_unit_interval
    );
    log_event!(
        ctx,
        INFO,
        event_names::BATCH_FINISHED,
        Stage::Aggregate,
        "Batch evaluation finished",
        evaluated = summary.evaluated,
        failed = summary.failed
    );

    Ok(BatchReport {
        results,
        failures,
        summary,
        calibration: factor,
    })
}

fn build_factor(
    request: &BatchRequest,
    options: &BatchOptions,
) -> Result<CalibrationFactor, BatchError> {
    let target = match request.target_prevalence {
        Some(value) => {
            pw_config::validate::validate_target_prevalence(value)?;
            value
        }
        None => options.target_prevalence,
    };
    Ok(CalibrationFactor::from_reference(
        &request.reference_sample,
        target,
    )?)
}

fn effective_workers(cells: usize, options: &BatchOptions) -> usize {
    if cells < options.parallel_threshold {
        1
    } else {
        options.max_workers.clamp(1, cells.max(1))
    }
}

/// Map `f` over contiguous chunks, one scoped thread per chunk.
///
/// Chunks come back in input order. A chunk whose worker panicked is returned
/// as `Err` with the items it covered. Recovery needs `panic = "unwind"`,
/// which every workspace profile keeps.
fn fan_out<'a, T, R, F>(items: &'a [T], workers: usize, f: F) -> Vec<Result<Vec<R>, &'a [T]>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }
    if workers <= 1 {
        return vec![Ok(items.iter().map(&f).collect())];
    }

    let chunk_size = items.len().div_ceil(workers);
    let f = &f;
    thread::scope(|s| {
        let handles: Vec<_> = items
            .chunks(chunk_size)
            .map(|chunk| (chunk, s.spawn(move || chunk.iter().map(f).collect::<Vec<R>>())))
            .collect();

        handles
            .into_iter()
            .map(|(chunk, handle)| {
                handle.join().map_err(|_| {
                    tracing::error!(
                        target: event_names::INTERNAL_ERROR,
                        cells = chunk.len(),
                        "batch worker panicked"
                    );
                    chunk
                })
            })
            .collect()
    })
}
