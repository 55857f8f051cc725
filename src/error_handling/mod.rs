//! Error handling and processing statistics.
//!
//! This module provides the error taxonomy of the pipeline and the shared
//! statistics tracker. The propagation policy: record-local failures are
//! absorbed and counted where they occur; only initialization failures
//! propagate up to the coordinator.

mod stats;
mod types;

pub use stats::ProcessingStats;
pub use types::{
    CacheError, DeliveryError, EnrichError, ErrorType, GeoError, InitializationError, WarningType,
};
