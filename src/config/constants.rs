//! Configuration constants.
//!
//! This module defines the operational defaults used throughout the pipeline:
//! pool sizes, batching and flush thresholds, backoff parameters, and timeouts.

/// Target index for bulk writes.
pub const DEFAULT_INDEX: &str = "bgptools";

/// Default Elasticsearch base URL.
pub const DEFAULT_ELASTIC_URL: &str = "http://localhost:9200";

/// Documents accumulated per batch before it is handed to delivery.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Producer pool size (one chunk file per worker at a time).
pub const DEFAULT_PRODUCER_WORKERS: usize = 8;

/// Delivery pool size (concurrent bulk requests against the backend).
pub const DEFAULT_DELIVERY_WORKERS: usize = 4;

/// Retry pool size.
pub const DEFAULT_RETRY_WORKERS: usize = 2;

/// Retry attempts per batch before it is dead-lettered.
/// Zero disables the ceiling and retries forever.
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 25;

/// Base delay for linear retry backoff.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 500;

/// Retry count beyond which the backoff delay stops growing.
/// The attempt ceiling is independent; this only caps the delay.
pub const DEFAULT_BACKOFF_GROWTH_CAP: u32 = 50;

/// Bulk request body threshold in bytes. A batch whose NDJSON body exceeds
/// this is split into multiple requests.
pub const DEFAULT_FLUSH_BYTES: usize = 5 * 1024 * 1024;

/// Maximum time between bulk flushes while a body is being assembled.
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 30;

/// Fixed delay before each delivery attempt, to smooth bursts against the
/// backend.
pub const DEFAULT_PACING_DELAY_MS: u64 = 100;

/// Directory for the ephemeral ASN description cache. Removed at the end of
/// the run.
pub const DEFAULT_CACHE_DIR: &str = ".asn_cache";

// Network operation timeouts
/// TCP connect timeout for the bulk client in seconds.
pub const CONNECT_TIMEOUT_SECS: u64 = 3;
/// Overall request timeout for the bulk client in seconds. A timed-out bulk
/// request is treated as a full failure of that sub-request and retried.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Seconds between progress log lines.
pub const PROGRESS_LOG_INTERVAL_SECS: u64 = 5;

/// Capacity of the batch hand-off queue into delivery. Kept small so a slow
/// backend exerts back-pressure on producers instead of buffering unbounded
/// batches in memory.
pub const DELIVERY_QUEUE_DEPTH: usize = 1;
