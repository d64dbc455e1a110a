//! Structured logging foundation for pw-core.
//!
//! Provides dual-mode logging:
//! - Human-readable console output for interactive use
//! - Machine-parseable JSONL for pipelines feeding the warning map
//!
//! # Usage
//!
//! ```ignore
//! use pw_core::logging::{init_logging, LogConfig, LogContext, Stage, event_names};
//!
//! let config = LogConfig::from_env(None, None);
//! init_logging(&config);
//!
//! let ctx = LogContext::new(generate_run_id()).with_batch_id("pw-20260115-143022-a7xq");
//! log_event!(ctx, INFO, event_names::BATCH_STARTED, Stage::Init, "Starting batch", cells = 42);
//! ```
//!
//! stdout is reserved for command payloads (JSON/MD output); stderr receives
//! all log output (human or JSONL).

pub mod config;
pub mod events;
pub mod layer;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Level, LogContext, Stage};
pub use layer::JsonlLayer;

use std::io::IsTerminal;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the logging subsystem.
///
/// Call once at startup. Event targets are event names rather than module
/// paths, so the filter is a global level unless RUST_LOG supplies directives.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(config.level).into())
        .from_env_lossy();

    let result = match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(use_ansi);

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init()
            }
        }
        LogFormat::Jsonl => tracing_subscriber::registry()
            .with(filter)
            .with(JsonlLayer::stderr())
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("global subscriber already installed; keeping it");
    }
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("run-{}", &uuid[..12])
}

/// Convenience macro for structured event logging with context.
///
/// Usage:
/// ```ignore
/// log_event!(ctx, INFO, event_names::BATCH_STARTED, Stage::Init, "Starting batch");
/// log_event!(ctx, WARN, event_names::CALIBRATE_OUT_OF_RANGE, Stage::Calibrate,
///     "Calibrated probability outside [0, 1]", cell_id = cell.id.as_str(), value = p);
/// ```
#[macro_export]
macro_rules! log_event {
    (@emit $level:ident, $ctx:expr, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::$level!(
            target: $event,
            run_id = %$ctx.run_id,
            batch_id = $ctx.batch_id.as_deref().unwrap_or_default(),
            stage = %$stage,
            message = $msg,
            $($key = $val,)*
        )
    };
    ($ctx:expr, INFO, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        $crate::log_event!(@emit info, $ctx, $event, $stage, $msg $(, $key = $val)*)
    };
    ($ctx:expr, DEBUG, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        $crate::log_event!(@emit debug, $ctx, $event, $stage, $msg $(, $key = $val)*)
    };
    ($ctx:expr, WARN, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        $crate::log_event!(@emit warn, $ctx, $event, $stage, $msg $(, $key = $val)*)
    };
    ($ctx:expr, ERROR, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        $crate::log_event!(@emit error, $ctx, $event, $stage, $msg $(, $key = $val)*)
    };
}
