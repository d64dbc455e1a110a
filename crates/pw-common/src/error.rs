//! Error types for the pest warning engine.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Calibration Error
//!   Reason: reference sample mean is zero
//!   Fix: Supply a reference sample drawn from the same model run ...
//! ```
//!
//! # Machine-Facing Output
//!
//! ```json
//! {
//!   "code": 21,
//!   "category": "calibration",
//!   "message": "calibration failed: reference sample mean is zero",
//!   "recoverable": true,
//!   "suggested_action": "fix_input"
//! }
//! ```
//!
//! Domain crates keep their own precise error enums (`ConfigurationError`,
//! `CalibrationError`, `CellEvaluationError`); this type is the surface they
//! are folded into at the CLI boundary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for pest warning operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Cost parameter and calibration config errors.
    Config,
    /// Probability calibration errors (fatal to the batch).
    Calibration,
    /// Per-cell evaluation errors (local to one cell).
    Evaluation,
    /// File I/O and serialization errors.
    Io,
    /// Invariant violations inside the engine.
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Calibration => write!(f, "calibration"),
            ErrorCategory::Evaluation => write!(f, "evaluation"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}

/// Suggested actions for callers to take in response to errors.
///
/// Every error here is deterministic in its inputs, so there is no `Retry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Fix the configuration file and rerun.
    FixConfig,
    /// Run the validation command.
    RunCheck,
    /// Fix the request payload (cells or reference sample).
    FixInput,
    /// Drop the offending cell and continue.
    Skip,
    /// Report as a bug.
    Report,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::FixConfig => write!(f, "fix_config"),
            SuggestedAction::RunCheck => write!(f, "run_check"),
            SuggestedAction::FixInput => write!(f, "fix_input"),
            SuggestedAction::Skip => write!(f, "skip"),
            SuggestedAction::Report => write!(f, "report"),
        }
    }
}

/// Unified error type for the pest warning CLI surface.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid cost parameters: {0}")]
    InvalidCosts(String),

    #[error("invalid calibration config: {0}")]
    InvalidCalibration(String),

    // Calibration errors (20-29)
    #[error("calibration failed: {0}")]
    Calibration(String),

    // Evaluation errors (30-39)
    #[error("cell {cell_id} could not be evaluated: {reason}")]
    CellEvaluation { cell_id: String, reason: String },

    #[error("invalid batch request: {0}")]
    InvalidRequest(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Internal errors (90-99)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Calibration errors
    /// - 30-39: Evaluation errors
    /// - 60-69: I/O errors
    /// - 90-99: Internal errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidCosts(_) => 11,
            Error::InvalidCalibration(_) => 12,
            Error::Calibration(_) => 21,
            Error::CellEvaluation { .. } => 30,
            Error::InvalidRequest(_) => 31,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
            Error::Internal(_) => 90,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidCosts(_) | Error::InvalidCalibration(_) => {
                ErrorCategory::Config
            }
            Error::Calibration(_) => ErrorCategory::Calibration,
            Error::CellEvaluation { .. } | Error::InvalidRequest(_) => ErrorCategory::Evaluation,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
            Error::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Returns whether this error is recoverable by changing inputs.
    ///
    /// Nothing here is recoverable by retrying unchanged inputs.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Internal(_))
    }

    /// Returns the suggested action for callers.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::Config(_) => SuggestedAction::RunCheck,
            Error::InvalidCosts(_) | Error::InvalidCalibration(_) => SuggestedAction::FixConfig,
            Error::Calibration(_) | Error::InvalidRequest(_) => SuggestedAction::FixInput,
            Error::CellEvaluation { .. } => SuggestedAction::Skip,
            Error::Io(_) | Error::Json(_) => SuggestedAction::FixInput,
            Error::Internal(_) => SuggestedAction::Report,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => "Run 'pw-core check' to see which config files were resolved.",
            Error::InvalidCosts(_) => {
                "Check costs.json: all values must be non-negative, loss_given_no_treatment must be at least loss_given_treatment, and the derived treatment cost must be between 0 and the avoided loss."
            }
            Error::InvalidCalibration(_) => {
                "Check calibration.json: target_prevalence must lie in (0, 1]."
            }
            Error::Calibration(_) => {
                "Supply a non-empty reference sample with a positive mean, drawn from the same model run as the cells."
            }
            Error::CellEvaluation { .. } => {
                "The cell was excluded. Check the upstream model output for NaN or out-of-range probabilities."
            }
            Error::InvalidRequest(_) => {
                "Validate the request against 'pw-core config schema --file request'."
            }
            Error::Io(_) => "Check that the file exists and is readable.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq . <file>'.",
            Error::Internal(_) => "This is a bug. Please report it with the input that triggered it.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidCosts(_) => "Invalid Cost Parameters",
            Error::InvalidCalibration(_) => "Invalid Calibration Configuration",
            Error::Calibration(_) => "Calibration Error",
            Error::CellEvaluation { .. } => "Cell Evaluation Error",
            Error::InvalidRequest(_) => "Invalid Batch Request",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
            Error::Internal(_) => "Internal Error",
        }
    }

    /// Format for a human terminal: headline, reason, fix.
    pub fn to_human(&self) -> String {
        format!(
            "✗ {}\n  Reason: {}\n  Fix: {}",
            self.headline(),
            self,
            self.remediation()
        )
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Suggested action for callers.
    pub suggested_action: SuggestedAction,

    /// Additional structured context (e.g., cell id, file path).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        if let Error::CellEvaluation { cell_id, .. } = err {
            context.insert("cell_id".to_string(), serde_json::json!(cell_id));
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }

    /// Serialize to pretty JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_grouped_by_category() {
        let cases = [
            (Error::Config("x".into()), ErrorCategory::Config, 10..20),
            (Error::InvalidCosts("x".into()), ErrorCategory::Config, 10..20),
            (Error::Calibration("x".into()), ErrorCategory::Calibration, 20..30),
            (
                Error::CellEvaluation {
                    cell_id: "c1".into(),
                    reason: "NaN".into(),
                },
                ErrorCategory::Evaluation,
                30..40,
            ),
            (Error::Internal("x".into()), ErrorCategory::Internal, 90..100),
        ];
        for (err, category, range) in cases {
            assert_eq!(err.category(), category, "{err}");
            assert!(range.contains(&err.code()), "{err} -> {}", err.code());
        }
    }

    #[test]
    fn structured_error_carries_cell_context() {
        let err = Error::CellEvaluation {
            cell_id: "tile-7".into(),
            reason: "raw probability is NaN".into(),
        };
        let structured = StructuredError::from(&err);
        assert_eq!(structured.code, 30);
        assert_eq!(structured.suggested_action, SuggestedAction::Skip);
        assert_eq!(structured.context["cell_id"], "tile-7");

        let json = structured.to_json();
        assert!(json.contains(r#""category":"evaluation""#));
        assert!(json.contains(r#""suggested_action":"skip""#));
    }

    #[test]
    fn internal_errors_are_not_recoverable() {
        assert!(!Error::Internal("bad".into()).is_recoverable());
        assert!(Error::Calibration("zero mean".into()).is_recoverable());
    }

    #[test]
    fn human_format_has_headline_and_fix() {
        let text = Error::Calibration("reference sample is empty".into()).to_human();
        assert!(text.starts_with("✗ Calibration Error"));
        assert!(text.contains("Reason: calibration failed: reference sample is empty"));
        assert!(text.contains("Fix: "));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert_eq!(err.category(), ErrorCategory::Io);
        assert_eq!(err.code(), 60);
    }
}
