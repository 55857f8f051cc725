//! bgp_indexer library: BGP routing-table enrichment and bulk indexing.
//!
//! Reads NDJSON chunk files of routing-table records, enriches each record
//! with the AS description (from a disk-backed lookup cache warmed from a
//! CSV export) and geo metadata (IP version and country code from a MaxMind
//! database), and delivers the enriched documents to an Elasticsearch-style
//! bulk API. Rejected documents are retried with linear backoff until they
//! land or exhaust the configured attempt ceiling.
//!
//! # Example
//!
//! ```no_run
//! use bgp_indexer::{run_pipeline, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     chunks: vec![std::path::PathBuf::from("chunks/table_0.json")],
//!     asn_csv: std::path::PathBuf::from("asn.csv"),
//!     geo_db: std::path::PathBuf::from("Country.mmdb"),
//!     ..Default::default()
//! };
//!
//! let report = run_pipeline(config).await?;
//! println!("Indexed {} of {} records", report.indexed, report.records);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

mod cache;
pub mod config;
mod elastic;
mod enrich;
mod error_handling;
mod geo;
pub mod initialization;
mod models;
mod pipeline;

// Re-export public API
pub use cache::LookupCache;
pub use config::{Config, LogFormat, LogLevel};
pub use elastic::{BulkClient, BulkOutcome};
pub use enrich::Enricher;
pub use error_handling::{
    CacheError, DeliveryError, EnrichError, ErrorType, GeoError, InitializationError,
    ProcessingStats, WarningType,
};
pub use geo::{parse_prefix, GeoLookup, GeoResolver, PrefixMeta};
pub use models::{Batch, EnrichedDocument, RawRecord};
pub use pipeline::{CompletionTracker, Pipeline, PipelineReport};

use anyhow::Result;

/// Runs the full enrichment pipeline with the provided configuration.
///
/// This is the main entry point for the library. It warms the lookup cache
/// from the ASN CSV, opens the geo database, verifies the bulk backend is
/// reachable, streams every chunk file through the producer/delivery/retry
/// pools, and returns once all records have been indexed or dead-lettered.
///
/// # Errors
///
/// Returns an error if:
/// - The lookup cache cannot be created or warmed from the CSV
/// - The geo database cannot be opened
/// - The bulk backend does not respond to the startup health check
pub async fn run_pipeline(config: Config) -> Result<PipelineReport> {
    let pipeline = Pipeline::from_config(&config).await?;
    pipeline.run().await
}
