//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::constants::*;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Pipeline configuration.
///
/// This struct doubles as the CLI surface of the binary and the programmatic
/// configuration of the library. The library never reads environment variables
/// or config files itself; everything is threaded through this struct.
///
/// # Examples
///
/// ```no_run
/// use bgp_indexer::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     chunks: vec![PathBuf::from("chunks/table_00.jsonl")],
///     asn_csv: PathBuf::from("asn.csv"),
///     geo_db: PathBuf::from("GeoLite2-Country.mmdb"),
///     elastic_url: "http://localhost:9200".into(),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "bgp_indexer",
    about = "Enriches BGP routing-table chunks and bulk-indexes them into Elasticsearch"
)]
pub struct Config {
    /// Pre-chunked routing-table files (newline-delimited JSON records)
    #[arg(required = true, value_name = "CHUNK")]
    pub chunks: Vec<PathBuf>,

    /// Two-column CSV mapping AS numbers to descriptions (header row skipped)
    #[arg(long, value_name = "FILE")]
    pub asn_csv: PathBuf,

    /// MaxMind country database (.mmdb), opened once and shared read-only
    #[arg(long, value_name = "FILE")]
    pub geo_db: PathBuf,

    /// Elasticsearch base URL
    #[arg(long, default_value = DEFAULT_ELASTIC_URL)]
    pub elastic_url: String,

    /// Elasticsearch API key
    #[arg(long, env = "ELASTIC_API_KEY", hide_env_values = true)]
    pub elastic_api_key: Option<String>,

    /// Target index name
    #[arg(long, default_value = DEFAULT_INDEX)]
    pub index: String,

    /// Documents per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Producer worker count (chunk files read in parallel)
    #[arg(long, default_value_t = DEFAULT_PRODUCER_WORKERS)]
    pub producer_workers: usize,

    /// Delivery worker count (concurrent bulk requests)
    #[arg(long, default_value_t = DEFAULT_DELIVERY_WORKERS)]
    pub delivery_workers: usize,

    /// Retry worker count
    #[arg(long, default_value_t = DEFAULT_RETRY_WORKERS)]
    pub retry_workers: usize,

    /// Retry attempts per batch before dead-lettering (0 = retry forever)
    #[arg(long, default_value_t = DEFAULT_MAX_RETRY_ATTEMPTS)]
    pub max_retry_attempts: u32,

    /// Base delay for linear retry backoff, in milliseconds
    #[arg(long, default_value_t = DEFAULT_BACKOFF_BASE_MS)]
    pub backoff_base_ms: u64,

    /// Retry count beyond which the backoff delay stops growing
    #[arg(long, default_value_t = DEFAULT_BACKOFF_GROWTH_CAP)]
    pub backoff_growth_cap: u32,

    /// Bulk request body threshold in bytes
    #[arg(long, default_value_t = DEFAULT_FLUSH_BYTES)]
    pub flush_bytes: usize,

    /// Maximum seconds between bulk flushes while a body is assembled
    #[arg(long, default_value_t = DEFAULT_FLUSH_INTERVAL_SECS)]
    pub flush_interval_secs: u64,

    /// Fixed delay before each delivery attempt, in milliseconds
    #[arg(long, default_value_t = DEFAULT_PACING_DELAY_MS)]
    pub pacing_delay_ms: u64,

    /// NDJSON file receiving documents dropped after the retry ceiling
    #[arg(long, value_name = "FILE")]
    pub dead_letter_path: Option<PathBuf>,

    /// Directory for the ephemeral ASN description cache
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunks: Vec::new(),
            asn_csv: PathBuf::from("asn.csv"),
            geo_db: PathBuf::from("GeoLite2-Country.mmdb"),
            elastic_url: DEFAULT_ELASTIC_URL.to_string(),
            elastic_api_key: None,
            index: DEFAULT_INDEX.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            producer_workers: DEFAULT_PRODUCER_WORKERS,
            delivery_workers: DEFAULT_DELIVERY_WORKERS,
            retry_workers: DEFAULT_RETRY_WORKERS,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            backoff_growth_cap: DEFAULT_BACKOFF_GROWTH_CAP,
            flush_bytes: DEFAULT_FLUSH_BYTES,
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL_SECS,
            pacing_delay_ms: DEFAULT_PACING_DELAY_MS,
            dead_letter_path: None,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.index, DEFAULT_INDEX);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.max_retry_attempts, DEFAULT_MAX_RETRY_ATTEMPTS);
        assert!(config.chunks.is_empty());
        assert!(config.dead_letter_path.is_none());
    }

    #[test]
    fn test_cli_parsing_overrides() {
        let config = Config::parse_from([
            "bgp_indexer",
            "chunk_00.jsonl",
            "chunk_01.jsonl",
            "--asn-csv",
            "asn.csv",
            "--geo-db",
            "country.mmdb",
            "--batch-size",
            "100",
            "--max-retry-attempts",
            "0",
        ]);
        assert_eq!(config.chunks.len(), 2);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.max_retry_attempts, 0);
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
    }
}
