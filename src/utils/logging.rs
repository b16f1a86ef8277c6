//! Logging initialization for Turnstile.
//!
//! Supports three formats:
//! - `pretty`: human-readable text with targets
//! - `component`: compact text; use the [`log_component!`] macro to add a
//!   `component` field for per-subsystem filtering
//! - `json`: structured JSON lines for log aggregators

use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{Result, TurnstileError};

/// Initialize the global tracing subscriber from config.
///
/// Call this once at startup before any tracing events are emitted.
/// `RUST_LOG` takes precedence over `cfg.level`.
///
/// # Errors
///
/// Fails if the log file cannot be opened or a global subscriber is
/// already installed.
pub fn init_logging(cfg: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));

    let file = match &cfg.file {
        Some(path) => Some(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?,
        ),
        None => None,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match (cfg.format, file) {
        (LogFormat::Json, Some(file)) => builder.json().with_writer(Mutex::new(file)).try_init(),
        (LogFormat::Json, None) => builder.json().with_writer(std::io::stderr).try_init(),
        (LogFormat::Pretty, Some(file)) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        (LogFormat::Pretty, None) => builder
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init(),
        (LogFormat::Component, Some(file)) => builder
            .compact()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        (LogFormat::Component, None) => builder
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    installed.map_err(|e| TurnstileError::Config(format!("failed to initialize logging: {}", e)))
}

/// Emit a component-tagged tracing event.
///
/// Works with any tracing level (`trace`, `debug`, `info`, `warn`, `error`):
///
/// ```
/// # use turnstile::log_component;
/// log_component!(info, "dispatcher", "message received");
/// log_component!(warn, "coordinator", "restarting", pending = 3usize, batch = 1usize);
/// ```
#[macro_export]
macro_rules! log_component {
    ($level:ident, $component:expr, $msg:expr) => {
        tracing::$level!(component = $component, $msg)
    };
    ($level:ident, $component:expr, $msg:expr, $($key:ident = $val:expr),+ $(,)?) => {
        tracing::$level!(component = $component, $($key = $val,)+ $msg)
    };
}
