//! Logging initialization.
//!
//! Logs go to stderr; stdout carries the JSON reports. `RUST_LOG` overrides
//! the configured level.

use idphoto_core::config::LoggingConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize from the `[logging]` section, letting `--verbose` and
/// `--json-logs` win.
pub fn init_from_config(config: &LoggingConfig, verbose: bool, json_logs: bool) {
    let (level, json) = resolve(config, verbose, json_logs);
    init(level, json);
}

fn resolve(config: &LoggingConfig, verbose: bool, json_logs: bool) -> (&str, bool) {
    let level = if verbose && !matches!(config.level.as_str(), "debug" | "trace") {
        "debug"
    } else {
        config.level.as_str()
    };
    (level, json_logs || config.format == "json")
}
