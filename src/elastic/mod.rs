//! Bulk-index client for the search backend.
//!
//! This module is the delivery boundary of the pipeline: it turns batches of
//! enriched documents into `_bulk` NDJSON requests and observes each
//! document's outcome independently. Transport failures and per-document
//! rejections are not hard errors; they land in the delivery outcome and
//! are retried by the pipeline.

mod client;

pub use client::{BulkClient, BulkOutcome};
