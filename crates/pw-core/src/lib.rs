//! Pest Warning Core Library
//!
//! This library turns a calibrated pest-presence probability surface into
//! per-cell decision outputs:
//! - Probability calibration against a known prevalence
//! - Expected cost, hat-cost, and EVPPI per cell
//! - The three-action utility rule (inaction, monitoring, spraying)
//! - Batch evaluation with per-slice summaries
//! - Configuration loading, structured logging, and exit codes for the CLI
//!
//! The binary entry point is in `main.rs`.

pub mod batch;
pub mod calibrate;
pub mod config;
pub mod decision;
pub mod exit_codes;
pub mod logging;
pub mod response;
pub mod schema;

pub use batch::{
    evaluate_batch, evaluate_batch_with_context, BatchError, BatchOptions, BatchReport,
    BatchRequest, BatchSummary, CellEvaluationError, CellFailure, DecisionResult, RiskCell,
};
pub use calibrate::{CalibrationError, CalibrationFactor};
pub use decision::{evppi, recommend, utilities, Action};
pub use response::BatchResponse;
