//! Structured event vocabulary for logging.
//!
//! Every event carries the run id, the batch id when one exists, and the
//! pipeline stage it was emitted from.

use serde::{Deserialize, Serialize};

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Processing stages in a batch evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and argument handling.
    Init,
    /// Config resolution and validation.
    Config,
    /// Calibration factor construction.
    Calibrate,
    /// Per-cell decision evaluation.
    Evaluate,
    /// Summary aggregation.
    Aggregate,
    /// Output rendering.
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Config => "config",
            Stage::Calibrate => "calibrate",
            Stage::Evaluate => "evaluate",
            Stage::Aggregate => "aggregate",
            Stage::Report => "report",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Batch lifecycle
    pub const BATCH_STARTED: &str = "batch.started";
    pub const BATCH_FINISHED: &str = "batch.finished";
    pub const BATCH_ABORTED: &str = "batch.aborted";

    // Calibrate stage
    pub const CALIBRATE_FACTOR: &str = "calibrate.factor";
    pub const CALIBRATE_OUT_OF_RANGE: &str = "calibrate.out_of_range";

    // Evaluate stage
    pub const EVALUATE_STARTED: &str = "evaluate.started";
    pub const EVALUATE_CELL_FAILED: &str = "evaluate.cell_failed";
    pub const EVALUATE_FINISHED: &str = "evaluate.finished";

    // Aggregate stage
    pub const AGGREGATE_SUMMARY: &str = "aggregate.summary";

    // Config/init events
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";

    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Correlation ids attached to every event of one invocation.
#[derive(Debug, Clone)]
pub struct LogContext {
    /// Unique ID for this invocation.
    pub run_id: String,
    /// Batch ID once a batch has been started.
    pub batch_id: Option<String>,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            batch_id: None,
        }
    }

    pub fn with_batch_id(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }

    /// Dummy context for library callers that never initialized logging.
    pub fn detached() -> Self {
        LogContext::new("run-detached")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_context() {
        let ctx = LogContext::new("run-abc").with_batch_id("pw-20260115-143022-b2c3");
        assert_eq!(ctx.run_id, "run-abc");
        assert_eq!(ctx.batch_id.as_deref(), Some("pw-20260115-143022-b2c3"));
        assert!(LogContext::detached().batch_id.is_none());
    }

    #[test]
    fn test_stage_display_matches_serde() {
        for stage in [
            Stage::Init,
            Stage::Config,
            Stage::Calibrate,
            Stage::Evaluate,
            Stage::Aggregate,
            Stage::Report,
        ] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }

    #[test]
    fn test_event_names() {
        assert_eq!(event_names::BATCH_STARTED, "batch.started");
        assert_eq!(event_names::CALIBRATE_OUT_OF_RANGE, "calibrate.out_of_range");
        assert_eq!(event_names::EVALUATE_CELL_FAILED, "evaluate.cell_failed");
    }
}
