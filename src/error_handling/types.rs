//! Error type definitions.
//!
//! This module defines all error and warning types used throughout the
//! pipeline. Per-concern failures get their own `thiserror` enum; counter
//! enums categorize the non-fatal conditions tallied during a run.

use log::SetLoggerError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
///
/// All of these abort the run: no useful work can proceed without the cache,
/// the geo database, or a reachable backend.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error opening or warming the ASN description cache.
    #[error("Lookup cache initialization error: {0}")]
    CacheError(#[from] CacheError),

    /// Error opening the geo database.
    #[error("Geo database initialization error: {0}")]
    GeoError(#[from] GeoError),

    /// Error building the bulk client or reaching the backend.
    #[error("Bulk backend initialization error: {0}")]
    DeliveryError(#[from] DeliveryError),
}

/// Error types for the ASN description cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Error creating the cache directory or database file.
    #[error("Cache storage creation error: {0}")]
    StorageCreation(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    /// Error reading the ASN description CSV.
    #[error("CSV read error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem error while removing the cache storage.
    #[error("Cache cleanup error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error types for geo resolution.
#[derive(Error, Debug)]
pub enum GeoError {
    /// Error opening or reading the geo database. Fatal at startup.
    #[error("Geo database error: {0}")]
    Database(#[from] maxminddb::MaxMindDbError),

    /// A CIDR string that cannot be parsed. Record-local: the affected
    /// record is skipped, the run continues.
    #[error("invalid prefix {cidr:?}: {reason}")]
    InvalidPrefix {
        /// The offending CIDR string.
        cidr: String,
        /// Why it failed to parse.
        reason: String,
    },
}

/// Error types for enriching a single record.
#[derive(Error, Debug)]
pub enum EnrichError {
    /// The record's prefix could not be classified. Record-local.
    #[error(transparent)]
    Prefix(#[from] GeoError),

    /// The cache lookup itself failed (not a miss; misses are `Ok(None)`).
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Error types for bulk delivery.
///
/// Transport failures and per-document rejections are not errors here; they
/// are collected into the delivery outcome and retried. These variants cover
/// conditions that retrying cannot fix.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Error building the HTTP client.
    #[error("HTTP client error: {0}")]
    Client(reqwest::Error),

    /// The backend could not be reached at startup.
    #[error("backend unreachable: {0}")]
    Connect(reqwest::Error),

    /// The backend answered the startup check with a non-success status.
    #[error("backend returned status {0} on startup check")]
    Unhealthy(u16),

    /// A document failed to serialize into the bulk body.
    #[error("bulk body encoding error: {0}")]
    Body(#[from] serde_json::Error),
}

/// Types of errors counted during a run.
///
/// These categorize actual failures: records lost to bad input, documents
/// rejected by the backend, and dead-letter bookkeeping problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    /// A chunk line that was not valid JSON (skipped, never retried).
    ParseLine,
    /// A record whose CIDR could not be parsed (skipped).
    InvalidPrefix,
    /// A cache lookup that failed outright (record skipped).
    CacheLookup,
    /// A document rejected by the backend or lost to a transport error
    /// (requeued for retry).
    DocumentRejected,
    /// A failure writing to the dead-letter file.
    DeadLetterWrite,
}

impl ErrorType {
    /// Human-readable label for statistics output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::ParseLine => "malformed input line",
            ErrorType::InvalidPrefix => "unparseable prefix",
            ErrorType::CacheLookup => "cache lookup failure",
            ErrorType::DocumentRejected => "document rejected by backend",
            ErrorType::DeadLetterWrite => "dead-letter write failure",
        }
    }
}

/// Types of warnings counted during a run.
///
/// Warnings are expected partial-data conditions: the document is still
/// delivered, just with an empty field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum WarningType {
    /// The AS number had no description in the cache.
    AsnDescriptionMissing,
    /// The prefix had no match in the geo database.
    CountryCodeMissing,
}

impl WarningType {
    /// Human-readable label for statistics output.
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningType::AsnDescriptionMissing => "AS description missing",
            WarningType::CountryCodeMissing => "country code missing",
        }
    }
}
