use crate::config::LoggingConfig;
use std::str::FromStr;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE: &str = "ember.log";

/// Routes tracing output to a daily log file, since the terminal belongs to the
/// TUI. `RUST_LOG` directives still apply on top of the configured level.
/// Keep the returned guard alive for as long as logs should be flushed.
pub fn initialize_logging(config: &LoggingConfig) -> WorkerGuard {
    let _ = std::fs::create_dir_all(&config.directory);

    let file_appender = tracing_appender::rolling::daily(&config.directory, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let level = parse_level(&config.level);
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.unwrap_or(Level::INFO).into()))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    if level.is_none() {
        tracing::warn!("Unknown log level '{}', using info.", config.level);
    }
    tracing::info!("Logging initialized successfully.");
    guard
}

fn parse_level(name: &str) -> Option<Level> {
    Level::from_str(name.trim()).ok()
}
