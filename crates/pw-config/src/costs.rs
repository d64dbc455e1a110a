//! Cost parameters governing the treatment decision economics.
//!
//! [`CostParameters`] is built once (from costs.json or the built-in defaults)
//! and shared read-only by every cell in every batch. Its fields are private so
//! an instance can only exist after validation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::validate::{check_schema_version, validate_costs, ConfigurationError, ValidationError};

/// Divisor applied to the application cost when deriving the treatment cost.
pub const TREATMENT_COST_DIVISOR: f64 = 10.0;

/// Offset subtracted after division when deriving the treatment cost.
pub const TREATMENT_COST_OFFSET: f64 = 24.0;

/// `treatment_application_cost / 10 - 24`.
pub fn derive_treatment_cost(treatment_application_cost: f64) -> f64 {
    treatment_application_cost / TREATMENT_COST_DIVISOR - TREATMENT_COST_OFFSET
}

/// Units the monetary constants (and therefore every output) are expressed in.
///
/// Informational only: never used in arithmetic and not checked for consistency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CostUnits {
    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_area_unit")]
    pub area_unit: String,

    #[serde(default = "default_period")]
    pub period: String,
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_area_unit() -> String {
    "ha".to_string()
}

fn default_period() -> String {
    "annum".to_string()
}

impl Default for CostUnits {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            area_unit: default_area_unit(),
            period: default_period(),
        }
    }
}

impl std::fmt::Display for CostUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.currency, self.area_unit, self.period)
    }
}

/// On-disk shape of costs.json (unvalidated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CostParametersFile {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    pub loss_given_treatment: f64,
    pub loss_given_no_treatment: f64,
    pub treatment_application_cost: f64,
    pub monitoring_cost: f64,

    #[serde(default)]
    pub units: CostUnits,
}

fn default_schema_version() -> String {
    crate::CONFIG_SCHEMA_VERSION.to_string()
}

impl Default for CostParametersFile {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            description: None,
            loss_given_treatment: 0.0,
            loss_given_no_treatment: 868.0,
            treatment_application_cost: 795.0,
            monitoring_cost: 48.0,
            units: CostUnits::default(),
        }
    }
}

/// Validated, immutable monetary constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CostParametersFile", into = "CostParametersFile")]
pub struct CostParameters {
    loss_given_treatment: f64,
    loss_given_no_treatment: f64,
    treatment_application_cost: f64,
    monitoring_cost: f64,
    treatment_cost: f64,
    units: CostUnits,
}

impl CostParameters {
    /// Build and validate cost parameters in the default units.
    pub fn new(
        loss_given_treatment: f64,
        loss_given_no_treatment: f64,
        treatment_application_cost: f64,
        monitoring_cost: f64,
    ) -> Result<Self, ConfigurationError> {
        Self::try_from(CostParametersFile {
            loss_given_treatment,
            loss_given_no_treatment,
            treatment_application_cost,
            monitoring_cost,
            ..CostParametersFile::default()
        })
    }

    /// Load and validate cost parameters from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::parse_json(&content)
    }

    /// Parse and validate cost parameters from a JSON string.
    pub fn parse_json(json: &str) -> Result<Self, ValidationError> {
        let file: CostParametersFile = serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))?;
        check_schema_version(&file.schema_version)?;
        Ok(Self::try_from(file)?)
    }

    pub fn loss_given_treatment(&self) -> f64 {
        self.loss_given_treatment
    }

    pub fn loss_given_no_treatment(&self) -> f64 {
        self.loss_given_no_treatment
    }

    pub fn treatment_application_cost(&self) -> f64 {
        self.treatment_application_cost
    }

    pub fn monitoring_cost(&self) -> f64 {
        self.monitoring_cost
    }

    /// Derived per-area treatment cost (`application / 10 - 24`).
    pub fn treatment_cost(&self) -> f64 {
        self.treatment_cost
    }

    /// Loss avoided by treating a present infestation.
    pub fn avoided_loss(&self) -> f64 {
        self.loss_given_no_treatment - self.loss_given_treatment
    }

    pub fn units(&self) -> &CostUnits {
        &self.units
    }
}

impl Default for CostParameters {
    fn default() -> Self {
        let file = CostParametersFile::default();
        CostParameters {
            treatment_cost: derive_treatment_cost(file.treatment_application_cost),
            loss_given_treatment: file.loss_given_treatment,
            loss_given_no_treatment: file.loss_given_no_treatment,
            treatment_application_cost: file.treatment_application_cost,
            monitoring_cost: file.monitoring_cost,
            units: file.units,
        }
    }
}

impl TryFrom<CostParametersFile> for CostParameters {
    type Error = ConfigurationError;

    fn try_from(file: CostParametersFile) -> Result<Self, Self::Error> {
        validate_costs(&file)?;
        Ok(CostParameters {
            treatment_cost: derive_treatment_cost(file.treatment_application_cost),
            loss_given_treatment: file.loss_given_treatment,
            loss_given_no_treatment: file.loss_given_no_treatment,
            treatment_application_cost: file.treatment_application_cost,
            monitoring_cost: file.monitoring_cost,
            units: file.units,
        })
    }
}

impl From<CostParameters> for CostParametersFile {
    fn from(params: CostParameters) -> Self {
        CostParametersFile {
            schema_version: default_schema_version(),
            description: None,
            loss_given_treatment: params.loss_given_treatment,
            loss_given_no_treatment: params.loss_given_no_treatment,
            treatment_application_cost: params.treatment_application_cost,
            monitoring_cost: params.monitoring_cost,
            units: params.units,
        }
    }
}
