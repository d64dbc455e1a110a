//! Pest Warning Core - Decision Engine CLI
//!
//! The main entry point for pw-core, handling:
//! - Batch evaluation of calibrated probability surfaces
//! - Single-probability decision ledgers
//! - Action thresholds and bands for the active cost parameters
//! - Configuration inspection, validation, and schema export

use clap::{Args, Parser, Subcommand, ValueEnum};
use pw_common::{BatchId, OutputFormat, StructuredError, SCHEMA_VERSION};
use pw_core::batch::{evaluate_batch_with_context, BatchOptions, BatchRequest};
use pw_core::config::{check_config, load_config, ConfigOptions, ResolvedConfig};
use pw_core::decision::{action_bands, explain, ActionThresholds};
use pw_core::exit_codes::ExitCode;
use pw_core::log_event;
use pw_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use pw_core::response::BatchResponse;
use pw_core::schema::{available_schemas, generate_schema};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Pest Warning Core - cost-aware spraying recommendations from risk surfaces
#[derive(Parser)]
#[command(name = "pw-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to costs.json
    #[arg(long, global = true)]
    costs: Option<PathBuf>,

    /// Path to calibration.json
    #[arg(long, global = true)]
    calibration: Option<PathBuf>,

    /// Directory searched for costs.json and calibration.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Log format on stderr (human or jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

impl GlobalOpts {
    fn config_options(&self) -> ConfigOptions {
        ConfigOptions {
            config_dir: self.config_dir.clone(),
            costs_path: self.costs.clone(),
            calibration_path: self.calibration.clone(),
        }
    }

    fn log_level(&self) -> Option<LogLevel> {
        if self.quiet {
            return Some(LogLevel::Error);
        }
        match self.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Calibrate and evaluate a batch of risk cells
    Evaluate(EvaluateArgs),

    /// Show every intermediate quantity for one probability
    Explain(ExplainArgs),

    /// Show the probabilities at which the recommendation changes
    Thresholds,

    /// Validate configuration files and report where each came from
    Check,

    /// Configuration management
    Config(ConfigArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Batch request JSON file, or "-" for stdin
    #[arg(long, short = 'i')]
    input: String,

    /// Maximum worker threads (default: available parallelism)
    #[arg(long)]
    workers: Option<usize>,

    /// Minimum number of valid cells before work is spread across threads
    #[arg(long)]
    parallel_threshold: Option<usize>,
}

#[derive(Args, Debug)]
struct ExplainArgs {
    /// Calibrated probability of pest presence
    #[arg(long, short = 'p', value_parser = parse_finite, allow_negative_numbers = true)]
    probability: f64,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective configuration (defaults included)
    Show,

    /// Print a JSON Schema
    Schema {
        /// Schema name (costs, calibration, request, report, ...)
        #[arg(long, required_unless_present = "list")]
        file: Option<String>,

        /// List available schema names
        #[arg(long)]
        list: bool,
    },

    /// Validate a single config file or a config directory
    Validate {
        path: PathBuf,

        /// Treat the file as this kind instead of guessing from its name
        #[arg(long)]
        kind: Option<ConfigKind>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConfigKind {
    Costs,
    Calibration,
}

fn parse_finite(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("probability must be finite, got {s}"))
    }
}

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::from_env(cli.global.log_level(), cli.global.log_format);
    init_logging(&log_config);
    let ctx = LogContext::new(generate_run_id());

    let exit_code = match &cli.command {
        Commands::Evaluate(args) => run_evaluate(&cli.global, args, &ctx),
        Commands::Explain(args) => run_explain(&cli.global, args, &ctx),
        Commands::Thresholds => run_thresholds(&cli.global, &ctx),
        Commands::Check => run_check(&cli.global),
        Commands::Config(args) => run_config(&cli.global, args, &ctx),
        Commands::Version => print_version(&cli.global),
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_evaluate(global: &GlobalOpts, args: &EvaluateArgs, ctx: &LogContext) -> ExitCode {
    let config = match resolve(global, ctx) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let request = match read_request(&args.input) {
        Ok(request) => request,
        Err(err) => return output_error(global, &err),
    };

    let batch_id = BatchId::new();
    let ctx = ctx.clone().with_batch_id(batch_id.to_string());

    let mut options = BatchOptions::from_calibration(&config.calibration);
    if let Some(workers) = args.workers {
        options = options.with_max_workers(workers);
    }
    if let Some(threshold) = args.parallel_threshold {
        options = options.with_parallel_threshold(threshold);
    }

    let report = match evaluate_batch_with_context(&request, &config.costs, &options, &ctx) {
        Ok(report) => report,
        Err(err) => return output_error(global, &err.into()),
    };
    let partial = report.is_partial();
    let response = BatchResponse::new(batch_id, ctx.run_id.as_str(), config.snapshot(), report);

    let printed = match global.format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Md => {
            print!("{}", response.to_markdown());
            Ok(())
        }
        OutputFormat::Summary => {
            println!("{}", response.summary_line());
            Ok(())
        }
        OutputFormat::Exitcode => Ok(()),
    };
    if let Err(err) = printed {
        return output_error(global, &err);
    }

    if partial {
        ExitCode::PartialFail
    } else {
        ExitCode::Clean
    }
}

fn read_request(input: &str) -> Result<BatchRequest, pw_common::Error> {
    let content = if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)?
    };
    BatchRequest::parse_json(&content)
        .map_err(|e| pw_common::Error::InvalidRequest(format!("{input}: {e}")))
}

fn run_explain(global: &GlobalOpts, args: &ExplainArgs, ctx: &LogContext) -> ExitCode {
    let config = match resolve(global, ctx) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let ledger = explain(args.probability, &config.costs);

    let printed = match global.format {
        OutputFormat::Json => print_json(&ledger),
        OutputFormat::Md => {
            print!("{}", ledger.to_markdown());
            Ok(())
        }
        OutputFormat::Summary => {
            println!(
                "p={}: {} (evppi {:.4} {})",
                ledger.probability, ledger.recommended_action, ledger.evppi.evppi, ledger.units
            );
            Ok(())
        }
        OutputFormat::Exitcode => Ok(()),
    };
    match printed {
        Ok(()) => ExitCode::Clean,
        Err(err) => output_error(global, &err),
    }
}

#[derive(Serialize)]
struct ThresholdsResponse {
    schema_version: &'static str,
    treatment_cost: f64,
    units: String,
    thresholds: ActionThresholds,
    bands: Vec<pw_core::decision::ActionBand>,
}

fn run_thresholds(global: &GlobalOpts, ctx: &LogContext) -> ExitCode {
    let config = match resolve(global, ctx) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let response = ThresholdsResponse {
        schema_version: SCHEMA_VERSION,
        treatment_cost: config.costs.treatment_cost(),
        units: config.costs.units().to_string(),
        thresholds: ActionThresholds::from_params(&config.costs),
        bands: action_bands(&config.costs),
    };

    let printed = match global.format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Summary => {
            let bands = response
                .bands
                .iter()
                .map(|b| format!("[{:.4}, {:.4}] {}", b.from, b.to, b.action))
                .collect::<Vec<_>>()
                .join(", ");
            println!("thresholds: {}", bands);
            Ok(())
        }
        OutputFormat::Exitcode => Ok(()),
        OutputFormat::Md => {
            let t = &response.thresholds;
            println!("# Action thresholds");
            println!();
            println!("Treatment cost C = {} {}", response.treatment_cost, response.units);
            println!();
            println!("| Crossing | Probability |");
            println!("|---|---|");
            println!("| inaction / monitoring | {} |", fmt_crossing(t.inaction_monitoring));
            println!("| monitoring / spraying | {} |", fmt_crossing(t.monitoring_spraying));
            println!("| inaction / spraying | {} |", fmt_crossing(t.inaction_spraying));
            println!();
            println!("| From | To | Action |");
            println!("|---|---|---|");
            for band in &response.bands {
                println!("| {:.4} | {:.4} | {} |", band.from, band.to, band.action);
            }
            Ok(())
        }
    };
    match printed {
        Ok(()) => ExitCode::Clean,
        Err(err) => output_error(global, &err),
    }
}

fn fmt_crossing(value: Option<f64>) -> String {
    value.map_or_else(|| "none".to_string(), |p| format!("{:.6}", p))
}

fn run_check(global: &GlobalOpts) -> ExitCode {
    let checks = check_config(&global.config_options());
    let all_ok = checks.iter().all(|c| c.is_ok());

    let results: Vec<serde_json::Value> = checks
        .iter()
        .map(|check| match &check.result {
            Ok(()) => serde_json::json!({
                "check": check.file.to_string(),
                "status": "ok",
                "source": check.source.to_string(),
                "path": check.path.as_ref().map(|p| p.display().to_string()),
                "using_defaults": check.path.is_none(),
            }),
            Err(err) => serde_json::json!({
                "check": check.file.to_string(),
                "status": "error",
                "source": check.source.to_string(),
                "path": check.path.as_ref().map(|p| p.display().to_string()),
                "error": err.to_string(),
                "code": err.validation_code(),
            }),
        })
        .collect();

    let response = serde_json::json!({
        "schema_version": SCHEMA_VERSION,
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "status": if all_ok { "ok" } else { "error" },
        "checks": results,
    });

    let printed = match global.format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Summary => {
            println!("check: {}", if all_ok { "OK" } else { "FAILED" });
            Ok(())
        }
        OutputFormat::Exitcode => Ok(()),
        OutputFormat::Md => {
            println!("# pw-core check");
            println!();
            for check in &checks {
                let symbol = if check.is_ok() { "✓" } else { "✗" };
                println!("{} {}: {}", symbol, check.file, check.source);
                if let Some(path) = &check.path {
                    println!("  Path: {}", path.display());
                }
                if let Err(err) = &check.result {
                    println!("  Error: {}", err);
                }
            }
            Ok(())
        }
    };
    if let Err(err) = printed {
        return output_error(global, &err);
    }

    if all_ok {
        ExitCode::Clean
    } else {
        ExitCode::ConfigError
    }
}

fn run_config(global: &GlobalOpts, args: &ConfigArgs, ctx: &LogContext) -> ExitCode {
    match &args.command {
        ConfigCommands::Show => run_config_show(global, ctx),
        ConfigCommands::Schema { file, list } => run_config_schema(global, file.as_deref(), *list),
        ConfigCommands::Validate { path, kind } => run_config_validate(global, path, *kind, ctx),
    }
}

/// Display the effective configuration (including defaults if no files present).
fn run_config_show(global: &GlobalOpts, ctx: &LogContext) -> ExitCode {
    let config = match resolve(global, ctx) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let snapshot = config.snapshot();
    let response = serde_json::json!({
        "schema_version": SCHEMA_VERSION,
        "costs": &config.costs,
        "treatment_cost": config.costs.treatment_cost(),
        "calibration": &config.calibration,
        "snapshot": &snapshot,
    });

    let printed = match global.format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Summary => {
            println!(
                "config {}: C={} {}, target prevalence {}",
                snapshot.short_id(),
                snapshot.summary.treatment_cost,
                snapshot.summary.units,
                snapshot.summary.target_prevalence
            );
            Ok(())
        }
        OutputFormat::Exitcode => Ok(()),
        OutputFormat::Md => {
            let s = &snapshot.summary;
            println!("# Configuration");
            println!();
            println!("Costs: {}", snapshot.costs_path.as_deref().unwrap_or("built-in defaults"));
            println!(
                "Calibration: {}",
                snapshot.calibration_path.as_deref().unwrap_or("built-in defaults")
            );
            println!();
            println!("| Constant | Value |");
            println!("|---|---|");
            println!("| L_t | {} |", s.loss_given_treatment);
            println!("| L_nt | {} |", s.loss_given_no_treatment);
            println!("| A | {} |", s.treatment_application_cost);
            println!("| M | {} |", s.monitoring_cost);
            println!("| C | {} |", s.treatment_cost);
            println!("| target prevalence | {} |", s.target_prevalence);
            println!();
            println!("Units: {}", s.units);
            Ok(())
        }
    };
    match printed {
        Ok(()) => ExitCode::Clean,
        Err(err) => output_error(global, &err),
    }
}

fn run_config_schema(global: &GlobalOpts, file: Option<&str>, list: bool) -> ExitCode {
    if list {
        let names: Vec<_> = available_schemas()
            .into_iter()
            .map(|(name, description)| serde_json::json!({"name": name, "description": description}))
            .collect();
        return match print_json(&names) {
            Ok(()) => ExitCode::Clean,
            Err(err) => output_error(global, &err),
        };
    }

    let name = file.unwrap_or_default();
    match generate_schema(name) {
        Some(schema) => match print_json(&schema) {
            Ok(()) => ExitCode::Clean,
            Err(err) => output_error(global, &err),
        },
        None => {
            let known = available_schemas()
                .into_iter()
                .map(|(name, _)| name)
                .collect::<Vec<_>>()
                .join(", ");
            eprintln!("unknown schema '{}' (available: {})", name, known);
            ExitCode::ArgsError
        }
    }
}

fn run_config_validate(
    global: &GlobalOpts,
    path: &Path,
    kind: Option<ConfigKind>,
    ctx: &LogContext,
) -> ExitCode {
    let options = if path.is_dir() {
        ConfigOptions {
            config_dir: Some(path.to_path_buf()),
            ..ConfigOptions::default()
        }
    } else {
        let kind = kind.unwrap_or_else(|| guess_kind(path));
        match kind {
            ConfigKind::Costs => ConfigOptions {
                costs_path: Some(path.to_path_buf()),
                ..ConfigOptions::default()
            },
            ConfigKind::Calibration => ConfigOptions {
                calibration_path: Some(path.to_path_buf()),
                ..ConfigOptions::default()
            },
        }
    };

    match load_config(&options) {
        Ok(config) => {
            let snapshot = config.snapshot();
            let response = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "status": "valid",
                "costs": {
                    "path": snapshot.costs_path,
                    "hash": snapshot.costs_hash,
                },
                "calibration": {
                    "path": snapshot.calibration_path,
                    "hash": snapshot.calibration_hash,
                },
            });
            let printed = match global.format {
                OutputFormat::Json => print_json(&response),
                OutputFormat::Exitcode => Ok(()),
                _ => {
                    println!("config validate: OK ({})", path.display());
                    Ok(())
                }
            };
            match printed {
                Ok(()) => ExitCode::Clean,
                Err(err) => output_error(global, &err),
            }
        }
        Err(err) => {
            let reason = err.to_string();
            log_event!(
                ctx,
                ERROR,
                event_names::CONFIG_ERROR,
                Stage::Config,
                "Config validation failed",
                error = reason.as_str()
            );
            output_error(global, &err.into())
        }
    }
}

fn guess_kind(path: &Path) -> ConfigKind {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if name.contains("calibration") {
        ConfigKind::Calibration
    } else {
        ConfigKind::Costs
    }
}

fn print_version(global: &GlobalOpts) -> ExitCode {
    let version_info = serde_json::json!({
        "schema_version": SCHEMA_VERSION,
        "config_schema_version": pw_config::CONFIG_SCHEMA_VERSION,
        "pw_core_version": env!("CARGO_PKG_VERSION"),
    });

    match global.format {
        OutputFormat::Json => {
            if let Err(err) = print_json(&version_info) {
                return output_error(global, &err);
            }
        }
        OutputFormat::Exitcode => {}
        _ => {
            println!("pw-core {}", env!("CARGO_PKG_VERSION"));
            println!("schema version: {}", SCHEMA_VERSION);
        }
    }
    ExitCode::Clean
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Load configuration, logging where it came from. On failure the error has
/// already been reported and the exit code is returned.
fn resolve(global: &GlobalOpts, ctx: &LogContext) -> Result<ResolvedConfig, ExitCode> {
    match load_config(&global.config_options()) {
        Ok(config) => {
            let costs_source = config.paths.costs_source.to_string();
            let calibration_source = config.paths.calibration_source.to_string();
            if config.paths.costs.is_none() && config.paths.calibration.is_none() {
                log_event!(
                    ctx,
                    DEBUG,
                    event_names::CONFIG_DEFAULT_USED,
                    Stage::Config,
                    "No config files found; using built-in defaults"
                );
            } else {
                log_event!(
                    ctx,
                    DEBUG,
                    event_names::CONFIG_LOADED,
                    Stage::Config,
                    "Configuration loaded",
                    costs_source = costs_source.as_str(),
                    calibration_source = calibration_source.as_str()
                );
            }
            Ok(config)
        }
        Err(err) => {
            let reason = err.to_string();
            log_event!(
                ctx,
                ERROR,
                event_names::CONFIG_ERROR,
                Stage::Config,
                "Failed to load configuration",
                error = reason.as_str()
            );
            Err(output_error(global, &err.into()))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), pw_common::Error> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| pw_common::Error::Internal(format!("failed to serialize output: {e}")))?;
    println!("{}", json);
    Ok(())
}

/// Report an error on stderr in the requested format and map it to an exit code.
fn output_error(global: &GlobalOpts, error: &pw_common::Error) -> ExitCode {
    match global.format {
        OutputFormat::Json => {
            eprintln!("{}", StructuredError::from(error).to_json());
        }
        OutputFormat::Exitcode => {}
        _ => {
            eprintln!("{}", error.to_human());
        }
    }
    ExitCode::from(error)
}
