//! Configuration resolution and path discovery.
//!
//! Resolution order: CLI arguments → environment variables → XDG paths → /etc → defaults.

use std::path::{Path, PathBuf};

/// Discovered configuration file paths.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Path to costs.json (or None if not found).
    pub costs: Option<PathBuf>,

    /// Path to calibration.json (or None if not found).
    pub calibration: Option<PathBuf>,

    /// Source of the costs config (for diagnostics).
    pub costs_source: ConfigSource,

    /// Source of the calibration config (for diagnostics).
    pub calibration_source: ConfigSource,
}

/// Where a configuration file was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Found in a directory given on the command line.
    CliConfigDir,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Found in /etc/pest-warning/.
    SystemConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::CliConfigDir => write!(f, "CLI config dir"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_COSTS_PATH: &str = "PEST_WARNING_COSTS";
pub const ENV_CALIBRATION_PATH: &str = "PEST_WARNING_CALIBRATION";
pub const ENV_CONFIG_DIR: &str = "PEST_WARNING_CONFIG_DIR";

/// Standard config file names.
pub const COSTS_FILENAME: &str = "costs.json";
pub const CALIBRATION_FILENAME: &str = "calibration.json";

/// Application name for XDG directories.
const APP_NAME: &str = "pest-warning";

/// Resolve configuration paths using the standard resolution order.
///
/// Resolution order for each config file:
/// 1. Explicit CLI path (if provided and present)
/// 2. CLI config directory + filename
/// 3. Environment variable (PEST_WARNING_COSTS, PEST_WARNING_CALIBRATION)
/// 4. PEST_WARNING_CONFIG_DIR environment variable + filename
/// 5. XDG config directory (~/.config/pest-warning/)
/// 6. System config (/etc/pest-warning/)
/// 7. Built-in defaults (None)
pub fn resolve_config(
    cli_costs: Option<&Path>,
    cli_calibration: Option<&Path>,
    cli_config_dir: Option<&Path>,
) -> ConfigPaths {
    let mut paths = ConfigPaths::default();

    paths.costs = resolve_single_config(
        cli_costs,
        cli_config_dir,
        ENV_COSTS_PATH,
        COSTS_FILENAME,
        &mut paths.costs_source,
    );

    paths.calibration = resolve_single_config(
        cli_calibration,
        cli_config_dir,
        ENV_CALIBRATION_PATH,
        CALIBRATION_FILENAME,
        &mut paths.calibration_source,
    );

    paths
}

/// Resolve a single configuration file path.
fn resolve_single_config(
    cli_path: Option<&Path>,
    cli_config_dir: Option<&Path>,
    env_var: &str,
    filename: &str,
    source: &mut ConfigSource,
) -> Option<PathBuf> {
    // 1. CLI argument
    if let Some(path) = cli_path {
        if path.exists() {
            *source = ConfigSource::CliArgument;
            return Some(path.to_path_buf());
        }
    }

    // 2. CLI config dir
    if let Some(dir) = cli_config_dir {
        let path = dir.join(filename);
        if path.exists() {
            *source = ConfigSource::CliConfigDir;
            return Some(path);
        }
    }

    // 3. Environment variable (direct path)
    if let Ok(env_path) = std::env::var(env_var) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            *source = ConfigSource::Environment;
            return Some(path);
        }
    }

    // 4. Environment variable (config dir)
    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(filename);
        if path.exists() {
            *source = ConfigSource::Environment;
            return Some(path);
        }
    }

    // 5. XDG config directory
    if let Some(xdg_config) = dirs::config_dir() {
        let path = xdg_config.join(APP_NAME).join(filename);
        if path.exists() {
            *source = ConfigSource::XdgConfig;
            return Some(path);
        }
    }

    // 6. System config
    let system_path = system_config_dir().join(filename);
    if system_path.exists() {
        *source = ConfigSource::SystemConfig;
        return Some(system_path);
    }

    // 7. Built-in default (None)
    *source = ConfigSource::BuiltinDefault;
    None
}

/// Get the XDG config directory for pest-warning.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the system config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::CliArgument), "CLI argument");
        assert_eq!(format!("{}", ConfigSource::CliConfigDir), "CLI config dir");
        assert_eq!(
            format!("{}", ConfigSource::Environment),
            "environment variable"
        );
        assert_eq!(format!("{}", ConfigSource::XdgConfig), "XDG config");
        assert_eq!(format!("{}", ConfigSource::SystemConfig), "system config");
        assert_eq!(
            format!("{}", ConfigSource::BuiltinDefault),
            "builtin default"
        );
    }

    #[test]
    fn test_cli_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let costs = dir.path().join("my-costs.json");
        fs::write(&costs, "{}").unwrap();

        let paths = resolve_config(Some(&costs), None, None);
        assert_eq!(paths.costs.as_deref(), Some(costs.as_path()));
        assert_eq!(paths.costs_source, ConfigSource::CliArgument);
    }

    #[test]
    fn test_cli_config_dir_lookup() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CALIBRATION_FILENAME), "{}").unwrap();

        let paths = resolve_config(None, None, Some(dir.path()));
        assert_eq!(
            paths.calibration,
            Some(dir.path().join(CALIBRATION_FILENAME))
        );
        assert_eq!(paths.calibration_source, ConfigSource::CliConfigDir);
    }

    #[test]
    fn test_xdg_config_dir() {
        if let Some(path) = xdg_config_dir() {
            assert!(path.ends_with(APP_NAME));
        }
    }

    #[test]
    fn test_system_config_dir() {
        assert_eq!(system_config_dir(), PathBuf::from("/etc/pest-warning"));
    }
}
