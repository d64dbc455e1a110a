//! Calibration settings (calibration.json).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::validate::{validate_calibration, ValidationError};

/// Known population prevalence the raw surface is rescaled to.
pub const DEFAULT_TARGET_PREVALENCE: f64 = 0.11;

/// Calibration configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalibrationConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Prevalence the mean of the reference sample is scaled to.
    #[serde(default = "default_target_prevalence")]
    pub target_prevalence: f64,

    /// Emit a warning for every calibrated probability outside [0, 1].
    #[serde(default = "default_true")]
    pub warn_out_of_unit_interval: bool,
}

fn default_schema_version() -> String {
    crate::CONFIG_SCHEMA_VERSION.to_string()
}

fn default_target_prevalence() -> f64 {
    DEFAULT_TARGET_PREVALENCE
}

fn default_true() -> bool {
    true
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            description: None,
            target_prevalence: DEFAULT_TARGET_PREVALENCE,
            warn_out_of_unit_interval: true,
        }
    }
}

impl CalibrationConfig {
    /// Load and validate calibration settings from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::parse_json(&content)
    }

    /// Parse and validate calibration settings from a JSON string.
    pub fn parse_json(json: &str) -> Result<Self, ValidationError> {
        let config: CalibrationConfig = serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))?;
        validate_calibration(&config)?;
        Ok(config)
    }
}
