//! Chunk producers: read, parse, enrich, batch.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::warn;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::enrich::Enricher;
use crate::error_handling::{EnrichError, ErrorType, ProcessingStats};
use crate::models::{Batch, RawRecord};
use crate::pipeline::counters::RunCounters;
use crate::pipeline::tracker::CompletionTracker;

/// Shared state for the producer pool.
pub(crate) struct ProducerContext {
    pub enricher: Arc<Enricher>,
    pub delivery_tx: mpsc::Sender<Batch>,
    pub tracker: Arc<CompletionTracker>,
    pub counters: Arc<RunCounters>,
    pub stats: Arc<ProcessingStats>,
    pub batch_size: usize,
}

/// Spawns the producer pool.
///
/// Each worker takes one chunk file path at a time from the shared path
/// queue and streams it to completion before taking another. The pool winds
/// down naturally when the path queue's sender is dropped after seeding.
pub(crate) fn spawn_producers(
    workers: usize,
    path_rx: mpsc::Receiver<PathBuf>,
    ctx: Arc<ProducerContext>,
) -> Vec<JoinHandle<()>> {
    let path_rx = Arc::new(Mutex::new(path_rx));

    (0..workers)
        .map(|_| {
            let path_rx = Arc::clone(&path_rx);
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                loop {
                    let path = { path_rx.lock().await.recv().await };
                    let Some(path) = path else { break };

                    if let Err(e) = process_chunk(&path, &ctx).await {
                        warn!("chunk {} failed: {e:#}", path.display());
                    }
                    // One unit per seeded chunk file.
                    ctx.tracker.done();
                }
            })
        })
        .collect()
}

/// Streams one chunk file: parse each NDJSON line, enrich it, and emit a
/// batch whenever the accumulator fills. The partial accumulator is emitted
/// at end of file.
///
/// Record order within the file is preserved into batches. Malformed lines
/// and unparseable prefixes are logged, counted, and skipped; they never
/// abort the file, let alone the run.
async fn process_chunk(path: &PathBuf, ctx: &ProducerContext) -> Result<()> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open chunk file {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut accumulator = Vec::with_capacity(ctx.batch_size);

    while let Some(line) = lines
        .next_line()
        .await
        .with_context(|| format!("read error in {}", path.display()))?
    {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let raw: RawRecord = match serde_json::from_str(trimmed) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed line in {}: {e}", path.display());
                ctx.stats.increment_error(ErrorType::ParseLine);
                ctx.counters
                    .parse_failures
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                continue;
            }
        };
        ctx.counters
            .records
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        match ctx.enricher.enrich(&raw).await {
            Ok(doc) => {
                accumulator.push(doc);
                if accumulator.len() >= ctx.batch_size {
                    emit(&mut accumulator, ctx).await;
                }
            }
            Err(EnrichError::Prefix(e)) => {
                warn!("skipping record: {e}");
                ctx.stats.increment_error(ErrorType::InvalidPrefix);
                ctx.counters
                    .invalid_prefixes
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
            Err(e) => {
                warn!("enrichment failed for {}: {e}", raw.cidr);
                ctx.stats.increment_error(ErrorType::CacheLookup);
            }
        }
    }

    emit(&mut accumulator, ctx).await;
    Ok(())
}

/// Hands the accumulated documents to delivery as one batch.
///
/// The tracker gains the batch unit before the hand-off so the run cannot
/// be declared idle while the batch sits in the queue.
async fn emit(accumulator: &mut Vec<crate::models::EnrichedDocument>, ctx: &ProducerContext) {
    if accumulator.is_empty() {
        return;
    }
    ctx.tracker.add(1);
    let batch = Batch::new(std::mem::take(accumulator));
    if ctx.delivery_tx.send(batch).await.is_err() {
        // Only reachable if the run is being torn down early.
        warn!("delivery queue closed; dropping batch");
        ctx.tracker.done();
    }
}
