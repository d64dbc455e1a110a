//! Pest warning configuration loading and validation.
//!
//! This crate provides:
//! - The validated, immutable [`CostParameters`] record (costs.json)
//! - Calibration settings (calibration.json)
//! - Config resolution (CLI → env → XDG → /etc → defaults)
//! - Semantic validation with stable error codes
//! - Config snapshots for batch reproducibility

pub mod calibration;
pub mod costs;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use calibration::CalibrationConfig;
pub use costs::{CostParameters, CostParametersFile, CostUnits};
pub use resolve::{resolve_config, ConfigPaths, ConfigSource};
pub use snapshot::ConfigSnapshot;
pub use validate::{ConfigurationError, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
