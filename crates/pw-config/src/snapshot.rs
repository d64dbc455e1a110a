//! Configuration snapshots for batch reproducibility.
//!
//! A snapshot captures the exact configuration a batch was evaluated under so
//! a published warning map can be traced back to its cost constants.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::resolve::{ConfigPaths, ConfigSource};
use crate::{CalibrationConfig, CostParameters};

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the configuration.
    pub schema_version: String,

    /// SHA-256 hash of the costs JSON content.
    #[serde(default)]
    pub costs_hash: Option<String>,

    /// Path where costs were loaded from.
    #[serde(default)]
    pub costs_path: Option<String>,

    /// Source of costs configuration.
    pub costs_source: String,

    /// SHA-256 hash of the calibration JSON content.
    #[serde(default)]
    pub calibration_hash: Option<String>,

    /// Path where calibration settings were loaded from.
    #[serde(default)]
    pub calibration_path: Option<String>,

    /// Source of calibration configuration.
    pub calibration_source: String,

    /// Combined hash of all config files (for quick comparison).
    pub combined_hash: String,

    /// Key configuration values for quick reference.
    pub summary: ConfigSummary,
}

/// Summary of the effective decision economics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConfigSummary {
    pub loss_given_treatment: f64,
    pub loss_given_no_treatment: f64,
    pub treatment_application_cost: f64,
    pub monitoring_cost: f64,
    pub treatment_cost: f64,
    pub target_prevalence: f64,
    pub units: String,
}

impl ConfigSummary {
    fn from_config(costs: &CostParameters, calibration: &CalibrationConfig) -> Self {
        ConfigSummary {
            loss_given_treatment: costs.loss_given_treatment(),
            loss_given_no_treatment: costs.loss_given_no_treatment(),
            treatment_application_cost: costs.treatment_application_cost(),
            monitoring_cost: costs.monitoring_cost(),
            treatment_cost: costs.treatment_cost(),
            target_prevalence: calibration.target_prevalence,
            units: costs.units().to_string(),
        }
    }
}

impl ConfigSnapshot {
    /// Create a new snapshot from loaded configuration.
    pub fn new(
        costs: &CostParameters,
        calibration: &CalibrationConfig,
        paths: &ConfigPaths,
        costs_json: Option<&str>,
        calibration_json: Option<&str>,
    ) -> Self {
        let costs_hash = costs_json.map(hash_content);
        let calibration_hash = calibration_json.map(hash_content);

        let combined = format!(
            "{}:{}",
            costs_hash.as_deref().unwrap_or("none"),
            calibration_hash.as_deref().unwrap_or("none")
        );

        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            costs_hash,
            costs_path: paths.costs.as_ref().map(|p| p.display().to_string()),
            costs_source: paths.costs_source.to_string(),
            calibration_hash,
            calibration_path: paths.calibration.as_ref().map(|p| p.display().to_string()),
            calibration_source: paths.calibration_source.to_string(),
            combined_hash: hash_content(&combined),
            summary: ConfigSummary::from_config(costs, calibration),
        }
    }

    /// Create a snapshot with only defaults (no config files loaded).
    pub fn defaults_only() -> Self {
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            costs_hash: None,
            costs_path: None,
            costs_source: ConfigSource::BuiltinDefault.to_string(),
            calibration_hash: None,
            calibration_path: None,
            calibration_source: ConfigSource::BuiltinDefault.to_string(),
            combined_hash: hash_content("none:none"),
            summary: ConfigSummary::from_config(
                &CostParameters::default(),
                &CalibrationConfig::default(),
            ),
        }
    }

    /// Serialize snapshot to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check if this snapshot matches another (same config files).
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.combined_hash == other.combined_hash
    }

    /// Get a short identifier for this snapshot (first 12 chars of hash).
    pub fn short_id(&self) -> &str {
        &self.combined_hash[..12.min(self.combined_hash.len())]
    }
}

/// Hash content with SHA-256 and return hex string.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
