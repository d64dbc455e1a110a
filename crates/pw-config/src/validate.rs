//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::calibration::CalibrationConfig;
use crate::costs::CostParametersFile;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Errors raised while loading a configuration file.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::VersionMismatch { .. } => 62,
            ValidationError::Configuration(e) => e.code(),
        }
    }
}

/// Semantically invalid cost or calibration settings.
///
/// Raised at construction time; a [`crate::CostParameters`] value that exists
/// has passed every check here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error(
        "loss_given_no_treatment ({loss_given_no_treatment}) must be at least loss_given_treatment ({loss_given_treatment})"
    )]
    NonMonotoneLoss {
        loss_given_treatment: f64,
        loss_given_no_treatment: f64,
    },

    #[error(
        "derived treatment cost {treatment_cost} is negative (treatment_application_cost {treatment_application_cost} is below 240)"
    )]
    NegativeTreatmentCost {
        treatment_application_cost: f64,
        treatment_cost: f64,
    },

    #[error(
        "derived treatment cost {treatment_cost} exceeds the loss avoided by treating ({avoided_loss})"
    )]
    TreatmentCostExceedsAvoidedLoss {
        treatment_cost: f64,
        avoided_loss: f64,
    },

    #[error("target_prevalence must be in (0, 1], got {value}")]
    InvalidTargetPrevalence { value: f64 },
}

impl ConfigurationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ConfigurationError::NonFinite { .. } => 11,
            ConfigurationError::Negative { .. } => 12,
            ConfigurationError::NonMonotoneLoss { .. } => 13,
            ConfigurationError::NegativeTreatmentCost { .. } => 14,
            ConfigurationError::TreatmentCostExceedsAvoidedLoss { .. } => 15,
            ConfigurationError::InvalidTargetPrevalence { .. } => 16,
        }
    }
}

/// Check a file's schema version against the supported one.
pub fn check_schema_version(actual: &str) -> ValidationResult<()> {
    if actual != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// Validate raw cost fields semantically.
///
/// Beyond the monotone-loss invariant, the derived treatment cost must lie in
/// `[0, loss_given_no_treatment - loss_given_treatment]`. Outside that band the
/// value of perfect information goes negative for some probabilities in [0, 1].
pub fn validate_costs(file: &CostParametersFile) -> Result<(), ConfigurationError> {
    let fields = [
        ("loss_given_treatment", file.loss_given_treatment),
        ("loss_given_no_treatment", file.loss_given_no_treatment),
        ("treatment_application_cost", file.treatment_application_cost),
        ("monitoring_cost", file.monitoring_cost),
    ];
    for (field, value) in fields {
        validate_monetary(field, value)?;
    }

    if file.loss_given_no_treatment < file.loss_given_treatment {
        return Err(ConfigurationError::NonMonotoneLoss {
            loss_given_treatment: file.loss_given_treatment,
            loss_given_no_treatment: file.loss_given_no_treatment,
        });
    }

    // Stricter than the cost formula alone requires. With D = L_nt - L_t the
    // EVPPI is min(C - pD, 0) - p(C - D), which is C(1 - p) when treating and
    // p(D - C) otherwise. C < 0 makes the first term negative near p = 0 and
    // C > D makes the second negative near p = 1.
    let treatment_cost = crate::costs::derive_treatment_cost(file.treatment_application_cost);
    if treatment_cost < 0.0 {
        return Err(ConfigurationError::NegativeTreatmentCost {
            treatment_application_cost: file.treatment_application_cost,
            treatment_cost,
        });
    }

    let avoided_loss = file.loss_given_no_treatment - file.loss_given_treatment;
    if treatment_cost > avoided_loss {
        return Err(ConfigurationError::TreatmentCostExceedsAvoidedLoss {
            treatment_cost,
            avoided_loss,
        });
    }

    Ok(())
}

/// Validate a single monetary scalar.
fn validate_monetary(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if !value.is_finite() {
        return Err(ConfigurationError::NonFinite { field, value });
    }
    if value < 0.0 {
        return Err(ConfigurationError::Negative { field, value });
    }
    Ok(())
}

/// Validate calibration configuration semantically.
pub fn validate_calibration(config: &CalibrationConfig) -> ValidationResult<()> {
    check_schema_version(&config.schema_version)?;
    validate_target_prevalence(config.target_prevalence)?;
    Ok(())
}

/// A target prevalence must be a probability strictly above zero.
pub fn validate_target_prevalence(value: f64) -> Result<(), ConfigurationError> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(ConfigurationError::InvalidTargetPrevalence { value });
    }
    Ok(())
}
