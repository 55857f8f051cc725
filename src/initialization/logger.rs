//! Logger initialization.
//!
//! This module provides functions to initialize the logger with custom formatting.

use std::io::Write;

use crate::config::LogFormat;
use crate::error_handling::InitializationError;
use colored::*;
use log::LevelFilter;

/// Initializes the logger with the specified level and format.
///
/// Configures `env_logger` with custom formatting. Supports both plain text
/// (with colors and emojis) and JSON formats for structured logging.
///
/// The logger reads from the `RUST_LOG` environment variable by default, but
/// the provided `level` parameter will override it. This allows developers to
/// use `RUST_LOG=debug` for quick debugging while still supporting explicit
/// CLI control via `--log-level`.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if logger initialization fails.
///
/// # Examples
///
/// ```bash
/// # Use RUST_LOG for quick debugging (no CLI args needed)
/// RUST_LOG=debug bgp_indexer chunks/*.json
///
/// # Override with CLI args (takes precedence)
/// RUST_LOG=debug bgp_indexer chunks/*.json --log-level info
///
/// # Per-module filtering via RUST_LOG
/// RUST_LOG=bgp_indexer=debug,reqwest=info bgp_indexer chunks/*.json
/// ```
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    colored::control::set_override(true);

    // Read from RUST_LOG environment variable first, then override with CLI arg
    let mut builder = env_logger::Builder::from_default_env();

    builder.filter_level(level);
    builder.filter_module("sqlx", LevelFilter::Info);
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("bgp_indexer", level);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{{\"ts\":{},\"level\":\"{}\",\"target\":\"{}\",\"msg\":{}}}",
                    chrono::Utc::now().timestamp_millis(),
                    record.level(),
                    record.target(),
                    serde_json::to_string(&record.args().to_string())
                        .unwrap_or_else(|_| "\"\"".into())
                )
            });
        }
        LogFormat::Plain => {
            builder.format(|buf, record| {
                let level = record.level();
                let colored_level = match level {
                    log::Level::Error => level.to_string().red(),
                    log::Level::Warn => level.to_string().yellow(),
                    log::Level::Info => level.to_string().green(),
                    log::Level::Debug => level.to_string().blue(),
                    log::Level::Trace => level.to_string().purple(),
                };

                let emoji = match level {
                    log::Level::Error => "❌",
                    log::Level::Warn => "⚠️",
                    log::Level::Info => "✔️",
                    log::Level::Debug => "🔍",
                    log::Level::Trace => "🔬",
                };

                writeln!(
                    buf,
                    "{} {} [{}] {}",
                    emoji,
                    record.target().cyan(),
                    colored_level,
                    record.args()
                )
            });
        }
    }

    // Use try_init() instead of init() to avoid panicking if logger is already initialized
    // This is important for tests where logger may be initialized multiple times
    builder.try_init().map_err(InitializationError::from)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_plain_format() {
        // env_logger can only be initialized once per process
        let _ = env_logger::try_init();

        let result = init_logger_with(LevelFilter::Info, LogFormat::Plain);
        // Accept either success or error (if already initialized)
        assert!(result.is_ok() || result.is_err());
    }

    #[test]
    fn test_init_logger_json_format() {
        let _ = env_logger::try_init();

        let result = init_logger_with(LevelFilter::Info, LogFormat::Json);
        assert!(result.is_ok() || result.is_err());
    }

    #[test]
    fn test_init_logger_all_levels() {
        let _ = env_logger::try_init();

        // Only the first call will succeed if the logger is already up; none
        // of them may panic.
        for level in [
            LevelFilter::Error,
            LevelFilter::Warn,
            LevelFilter::Info,
            LevelFilter::Debug,
            LevelFilter::Trace,
        ] {
            let result = init_logger_with(level, LogFormat::Plain);
            assert!(
                result.is_ok() || result.is_err(),
                "Level {:?} should not panic",
                level
            );
        }
    }
}
