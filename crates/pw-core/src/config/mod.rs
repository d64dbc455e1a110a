//! Configuration loading for pw-core.
//!
//! This module handles:
//! - Loading costs.json and calibration.json
//! - Config resolution order (CLI > env > XDG > /etc > defaults)
//! - Semantic validation on load
//! - Config snapshot generation for batch output

use std::path::{Path, PathBuf};

use pw_config::resolve::{resolve_config, ConfigPaths, ConfigSource};
use pw_config::{CalibrationConfig, ConfigSnapshot, CostParameters, ValidationError};
use thiserror::Error;

/// Which configuration file an error concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFile {
    Costs,
    Calibration,
}

impl std::fmt::Display for ConfigFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigFile::Costs => write!(f, "costs"),
            ConfigFile::Calibration => write!(f, "calibration"),
        }
    }
}

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{file} config file not found: {path}")]
    NotFound { file: ConfigFile, path: PathBuf },

    #[error("{file} config {path} is invalid: {source}")]
    Invalid {
        file: ConfigFile,
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
}

impl ConfigError {
    /// Stable code of the underlying validation failure, if any.
    pub fn validation_code(&self) -> Option<u32> {
        match self {
            ConfigError::NotFound { .. } => None,
            ConfigError::Invalid { source, .. } => Some(source.code()),
        }
    }
}

impl From<ConfigError> for pw_common::Error {
    fn from(err: ConfigError) -> Self {
        let message = err.to_string();
        match err {
            ConfigError::NotFound { .. } => pw_common::Error::Config(message),
            ConfigError::Invalid {
                file: ConfigFile::Costs,
                ..
            } => pw_common::Error::InvalidCosts(message),
            ConfigError::Invalid {
                file: ConfigFile::Calibration,
                ..
            } => pw_common::Error::InvalidCalibration(message),
        }
    }
}

/// Configuration resolution options.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Explicit config directory.
    pub config_dir: Option<PathBuf>,
    /// Explicit costs file path.
    pub costs_path: Option<PathBuf>,
    /// Explicit calibration file path.
    pub calibration_path: Option<PathBuf>,
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub costs: CostParameters,
    pub calibration: CalibrationConfig,
    pub paths: ConfigPaths,
    costs_json: Option<String>,
    calibration_json: Option<String>,
}

impl ResolvedConfig {
    /// Built-in defaults with no files loaded.
    pub fn defaults() -> Self {
        ResolvedConfig {
            costs: CostParameters::default(),
            calibration: CalibrationConfig::default(),
            paths: ConfigPaths::default(),
            costs_json: None,
            calibration_json: None,
        }
    }

    /// Create a config snapshot for batch output.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot::new(
            &self.costs,
            &self.calibration,
            &self.paths,
            self.costs_json.as_deref(),
            self.calibration_json.as_deref(),
        )
    }
}

/// Load configuration with the standard resolution order.
///
/// An explicit path that does not exist is an error rather than a silent
/// fall-through to the next source.
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    require_exists(ConfigFile::Costs, options.costs_path.as_deref())?;
    require_exists(ConfigFile::Calibration, options.calibration_path.as_deref())?;

    let paths = resolve_paths(options);
    let (costs, costs_json) = load_costs(paths.costs.as_deref())?;
    let (calibration, calibration_json) = load_calibration(paths.calibration.as_deref())?;

    Ok(ResolvedConfig {
        costs,
        calibration,
        paths,
        costs_json,
        calibration_json,
    })
}

/// Outcome of checking one configuration file.
#[derive(Debug)]
pub struct FileCheck {
    pub file: ConfigFile,
    pub source: ConfigSource,
    pub path: Option<PathBuf>,
    pub result: Result<(), ConfigError>,
}

impl FileCheck {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Resolve and validate each file on its own, so one broken file does not
/// hide the state of the other.
pub fn check_config(options: &ConfigOptions) -> Vec<FileCheck> {
    let paths = resolve_paths(options);

    let costs = require_exists(ConfigFile::Costs, options.costs_path.as_deref())
        .and_then(|()| load_costs(paths.costs.as_deref()).map(|_| ()));
    let calibration = require_exists(ConfigFile::Calibration, options.calibration_path.as_deref())
        .and_then(|()| load_calibration(paths.calibration.as_deref()).map(|_| ()));

    vec![
        FileCheck {
            file: ConfigFile::Costs,
            source: paths.costs_source,
            path: paths.costs,
            result: costs,
        },
        FileCheck {
            file: ConfigFile::Calibration,
            source: paths.calibration_source,
            path: paths.calibration,
            result: calibration,
        },
    ]
}

fn resolve_paths(options: &ConfigOptions) -> ConfigPaths {
    resolve_config(
        options.costs_path.as_deref(),
        options.calibration_path.as_deref(),
        options.config_dir.as_deref(),
    )
}

fn load_costs(path: Option<&Path>) -> Result<(CostParameters, Option<String>), ConfigError> {
    match path {
        Some(path) => {
            let content = read(ConfigFile::Costs, path)?;
            let costs = CostParameters::parse_json(&content)
                .map_err(|source| invalid(ConfigFile::Costs, path, source))?;
            Ok((costs, Some(content)))
        }
        None => Ok((CostParameters::default(), None)),
    }
}

fn load_calibration(
    path: Option<&Path>,
) -> Result<(CalibrationConfig, Option<String>), ConfigError> {
    match path {
        Some(path) => {
            let content = read(ConfigFile::Calibration, path)?;
            let calibration = CalibrationConfig::parse_json(&content)
                .map_err(|source| invalid(ConfigFile::Calibration, path, source))?;
            Ok((calibration, Some(content)))
        }
        None => Ok((CalibrationConfig::default(), None)),
    }
}

fn require_exists(file: ConfigFile, path: Option<&Path>) -> Result<(), ConfigError> {
    match path {
        Some(path) if !path.exists() => Err(ConfigError::NotFound {
            file,
            path: path.to_path_buf(),
        }),
        _ => Ok(()),
    }
}

fn read(file: ConfigFile, path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| {
        invalid(
            file,
            path,
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e)),
        )
    })
}

fn invalid(file: ConfigFile, path: &Path, source: ValidationError) -> ConfigError {
    ConfigError::Invalid {
        file,
        path: path.to_path_buf(),
        source,
    }
}
