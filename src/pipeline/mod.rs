//! The staged concurrent pipeline.
//!
//! Topology: chunk paths → producer pool (parse + enrich + batch) →
//! delivery pool (bulk submission) → retry pool (backoff) → delivery again,
//! until every document is accepted or dead-lettered. A completion tracker
//! counts in-flight units across all stages; the coordinator waits for it
//! to drain, then tears the pools down in dependency order: the path queue
//! closes when seeding finishes, and the delivery/retry loops are cancelled
//! only once nothing is left in flight.

mod counters;
mod dead_letter;
mod delivery;
mod producer;
mod retry;
mod tracker;

pub use counters::{CounterSnapshot, RunCounters};
pub use dead_letter::DeadLetter;
pub use tracker::CompletionTracker;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cache::LookupCache;
use crate::config::{Config, DELIVERY_QUEUE_DEPTH, PROGRESS_LOG_INTERVAL_SECS};
use crate::elastic::BulkClient;
use crate::enrich::Enricher;
use crate::error_handling::{InitializationError, ProcessingStats};
use crate::geo::{GeoLookup, GeoResolver};
use crate::pipeline::delivery::DeliveryContext;
use crate::pipeline::producer::ProducerContext;
use crate::pipeline::retry::RetryContext;

/// Summary of a completed run.
///
/// `indexed` may exceed `records` only if the backend acknowledged a
/// document twice, which at-least-once delivery permits but the retry stage
/// never requests.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Records parsed from chunk files.
    pub records: u64,
    /// Documents accepted by the backend.
    pub indexed: u64,
    /// Lines skipped as malformed JSON.
    pub parse_failures: u64,
    /// Records skipped for unparseable prefixes.
    pub invalid_prefixes: u64,
    /// Retry hand-offs: incremented once per failed delivery attempt that
    /// produced a retry batch, so a thrice-retried batch counts three times.
    pub retried_batches: u64,
    /// Documents dropped to the dead-letter sink.
    pub dead_lettered: u64,
    /// Wall-clock duration of the run.
    pub elapsed_seconds: f64,
}

/// The assembled pipeline, ready to run once.
///
/// All collaborators are passed in explicitly; [`Pipeline::from_config`]
/// builds the production set (SQLite-backed cache, MaxMind resolver, HTTP
/// bulk client), while tests inject substitutes through [`Pipeline::new`].
pub struct Pipeline {
    config: Config,
    cache: Arc<LookupCache>,
    geo: Arc<dyn GeoLookup>,
    client: Arc<BulkClient>,
}

impl Pipeline {
    /// Assembles a pipeline from pre-built collaborators.
    pub fn new(
        config: Config,
        cache: Arc<LookupCache>,
        geo: Arc<dyn GeoLookup>,
        client: Arc<BulkClient>,
    ) -> Self {
        Pipeline {
            config,
            cache,
            geo,
            client,
        }
    }

    /// Opens and warms all production collaborators.
    ///
    /// Any failure here is fatal for the run: without the cache, the geo
    /// database, or a bulk client there is no useful work to do.
    pub async fn from_config(config: &Config) -> Result<Self, InitializationError> {
        let cache = LookupCache::open(&config.cache_dir).await?;
        cache.warm(&config.asn_csv).await?;

        let geo: Arc<dyn GeoLookup> = Arc::new(GeoResolver::open(&config.geo_db)?);
        let client = Arc::new(BulkClient::new(config)?);

        Ok(Pipeline::new(config.clone(), Arc::new(cache), geo, client))
    }

    /// Runs the pipeline to completion over `config.chunks`.
    ///
    /// Returns once every record has been delivered or dead-lettered and
    /// all pools have shut down. The lookup cache is destroyed on the way
    /// out; it is ephemeral per run.
    pub async fn run(self) -> Result<PipelineReport> {
        let Pipeline {
            config,
            cache,
            geo,
            client,
        } = self;

        client
            .ping()
            .await
            .context("bulk backend startup check failed")?;

        let start = std::time::Instant::now();
        let stats = Arc::new(ProcessingStats::new());
        let counters = Arc::new(RunCounters::new());
        let tracker = Arc::new(CompletionTracker::new());
        let cancel = CancellationToken::new();
        let dead_letter = Arc::new(DeadLetter::new(config.dead_letter_path.clone()));

        let (path_tx, path_rx) = mpsc::channel(config.chunks.len().max(1));
        let (delivery_tx, delivery_rx) = mpsc::channel(DELIVERY_QUEUE_DEPTH);
        let (retry_tx, retry_rx) = mpsc::unbounded_channel();

        let retry_handles = retry::spawn_retry_workers(
            config.retry_workers.max(1),
            retry_rx,
            Arc::new(RetryContext {
                delivery_tx: delivery_tx.clone(),
                tracker: Arc::clone(&tracker),
                backoff_base: Duration::from_millis(config.backoff_base_ms),
                backoff_growth_cap: config.backoff_growth_cap,
                cancel: cancel.child_token(),
            }),
        );

        let delivery_handles = delivery::spawn_delivery_workers(
            config.delivery_workers.max(1),
            delivery_rx,
            Arc::new(DeliveryContext {
                client: Arc::clone(&client),
                retry_tx,
                dead_letter,
                tracker: Arc::clone(&tracker),
                counters: Arc::clone(&counters),
                stats: Arc::clone(&stats),
                pacing_delay: Duration::from_millis(config.pacing_delay_ms),
                max_retry_attempts: config.max_retry_attempts,
                cancel: cancel.child_token(),
            }),
        );

        let enricher = Arc::new(Enricher::new(
            Arc::clone(&cache),
            Arc::clone(&geo),
            Arc::clone(&stats),
        ));
        let producer_handles = producer::spawn_producers(
            config.producer_workers.max(1),
            path_rx,
            Arc::new(ProducerContext {
                enricher,
                delivery_tx,
                tracker: Arc::clone(&tracker),
                counters: Arc::clone(&counters),
                stats: Arc::clone(&stats),
                batch_size: config.batch_size.max(1),
            }),
        );

        let progress_task = {
            let counters = Arc::clone(&counters);
            let tracker = Arc::clone(&tracker);
            let cancel = cancel.child_token();
            tokio::spawn(async move {
                let mut interval =
                    tokio::time::interval(Duration::from_secs(PROGRESS_LOG_INTERVAL_SECS));
                interval.tick().await; // first tick fires immediately
                loop {
                    tokio::select! {
                        _ = interval.tick() => log_progress(start, &counters, &tracker),
                        _ = cancel.cancelled() => break,
                    }
                }
            })
        };

        // Seed the path queue. One tracker unit per chunk file; the queue
        // closes when the sender drops, which is how producers learn there
        // is no more input.
        for path in &config.chunks {
            tracker.add(1);
            if path_tx.send(path.clone()).await.is_err() {
                tracker.done();
                warn!("path queue closed during seeding");
            }
        }
        drop(path_tx);

        tracker.wait_idle().await;
        cancel.cancel();

        for handle in producer_handles
            .into_iter()
            .chain(delivery_handles)
            .chain(retry_handles)
        {
            if let Err(e) = handle.await {
                warn!("worker task panicked: {e}");
            }
        }
        let _ = progress_task.await;
        drop(geo);
        drop(client);

        stats.log_summary();
        log_progress(start, &counters, &tracker);

        // The cache is ephemeral per run; all workers have shut down, so
        // ours should be the last reference.
        match Arc::try_unwrap(cache) {
            Ok(cache) => {
                if let Err(e) = cache.destroy().await {
                    warn!("failed to remove lookup cache: {e}");
                }
            }
            Err(_) => warn!("lookup cache still shared at shutdown; leaving storage in place"),
        }

        let elapsed_seconds = start.elapsed().as_secs_f64();
        let snapshot = counters.snapshot();
        info!(
            "Indexed {} of {} records in {:.1}s ({} parse failures, {} invalid prefixes, {} dead-lettered)",
            snapshot.indexed,
            snapshot.records,
            elapsed_seconds,
            snapshot.parse_failures,
            snapshot.invalid_prefixes,
            snapshot.dead_lettered
        );

        Ok(PipelineReport {
            records: snapshot.records,
            indexed: snapshot.indexed,
            parse_failures: snapshot.parse_failures,
            invalid_prefixes: snapshot.invalid_prefixes,
            retried_batches: snapshot.retried_batches,
            dead_lettered: snapshot.dead_lettered,
            elapsed_seconds,
        })
    }
}

/// Periodic progress line: documents indexed, throughput, units in flight.
fn log_progress(
    start: std::time::Instant,
    counters: &Arc<RunCounters>,
    tracker: &Arc<CompletionTracker>,
) {
    let elapsed = start.elapsed().as_secs_f64();
    let snapshot = counters.snapshot();
    let rate = if elapsed > 0.0 {
        snapshot.indexed as f64 / elapsed
    } else {
        0.0
    };
    info!(
        "Indexed {} docs in {:.1}s (~{:.1} docs/sec), {} units in flight",
        snapshot.indexed,
        elapsed,
        rate,
        tracker.outstanding()
    );
}
