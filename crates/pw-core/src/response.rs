//! Output envelope for one evaluated batch.
//!
//! stdout carries exactly one of these per `evaluate` invocation, rendered as
//! JSON, Markdown, or a one-line summary.

use chrono::{DateTime, Utc};
use pw_common::{BatchId, SCHEMA_VERSION};
use pw_config::ConfigSnapshot;
use schemars::JsonSchema;
use serde::Serialize;

use crate::batch::BatchReport;
use crate::decision::Action;

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct BatchResponse {
    pub schema_version: String,
    pub batch_id: BatchId,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    /// Configuration the batch was evaluated under.
    pub config: ConfigSnapshot,
    pub report: BatchReport,
}

impl BatchResponse {
    pub fn new(
        batch_id: BatchId,
        run_id: impl Into<String>,
        config: ConfigSnapshot,
        report: BatchReport,
    ) -> Self {
        BatchResponse {
            schema_version: SCHEMA_VERSION.to_string(),
            batch_id,
            run_id: run_id.into(),
            generated_at: Utc::now(),
            config,
            report,
        }
    }

    /// One line for quick status checks.
    pub fn summary_line(&self) -> String {
        let summary = &self.report.summary;
        let counts = Action::ALL
            .iter()
            .map(|&a| format!("{} {}", a, summary.action_counts.get(a)))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "[{}] evaluate: {} cells, {} evaluated, {} failed ({})",
            self.batch_id, summary.total_cells, summary.evaluated, summary.failed, counts
        )
    }

    pub fn to_markdown(&self) -> String {
        let summary = &self.report.summary;
        let calibration = &self.report.calibration;
        let mut out = String::new();

        out.push_str(&format!("# Batch {}\n\n", self.batch_id));
        out.push_str(&format!(
            "Config {} ({}), units {}\n\n",
            self.config.short_id(),
            self.config.costs_source,
            summary.units
        ));
        out.push_str(&format!(
            "Calibration factor {:.6} (reference mean {:.6} over {} values, target {})\n\n",
            calibration.factor(),
            calibration.reference_mean(),
            calibration.reference_len(),
            calibration.target_prevalence()
        ));

        out.push_str("| Cells | Evaluated | Failed | Out of [0, 1] | Mean EVPPI | Max EVPPI |\n");
        out.push_str("|---|---|---|---|---|---|\n");
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n\n",
            summary.total_cells,
            summary.evaluated,
            summary.failed,
            summary.out_of_unit_interval,
            fmt_opt(summary.mean_evppi),
            fmt_opt(summary.max_evppi)
        ));

        out.push_str("| Action | Cells |\n|---|---|\n");
        for action in Action::ALL {
            out.push_str(&format!(
                "| {} | {} |\n",
                action,
                summary.action_counts.get(action)
            ));
        }

        if !summary.slices.is_empty() {
            out.push_str("\n## Slices\n\n");
            out.push_str("| Date | Evaluated | Failed | Inaction | Monitoring | Spraying | Mean EVPPI |\n");
            out.push_str("|---|---|---|---|---|---|---|\n");
            for (date, slice) in &summary.slices {
                out.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} | {} |\n",
                    date,
                    slice.evaluated,
                    slice.failed,
                    slice.action_counts.inaction,
                    slice.action_counts.monitoring,
                    slice.action_counts.spraying,
                    fmt_opt(slice.mean_evppi)
                ));
            }
        }

        if !self.report.failures.is_empty() {
            out.push_str("\n## Failures\n\n");
            for failure in &self.report.failures {
                match failure.slice {
                    Some(date) => {
                        out.push_str(&format!("- `{}` ({}): {}\n", failure.id, date, failure.reason))
                    }
                    None => out.push_str(&format!("- `{}`: {}\n", failure.id, failure.reason)),
                }
            }
        }
        out
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v))
}
