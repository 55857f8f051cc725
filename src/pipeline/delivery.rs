//! Delivery workers: bulk submission and failure routing.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::elastic::BulkClient;
use crate::error_handling::{ErrorType, ProcessingStats};
use crate::models::Batch;
use crate::pipeline::counters::RunCounters;
use crate::pipeline::dead_letter::DeadLetter;
use crate::pipeline::tracker::CompletionTracker;

/// Shared state for the delivery pool.
pub(crate) struct DeliveryContext {
    pub client: Arc<BulkClient>,
    pub retry_tx: mpsc::UnboundedSender<Batch>,
    pub dead_letter: Arc<DeadLetter>,
    pub tracker: Arc<CompletionTracker>,
    pub counters: Arc<RunCounters>,
    pub stats: Arc<ProcessingStats>,
    pub pacing_delay: Duration,
    /// Retry attempts per batch before dead-lettering; 0 retries forever.
    pub max_retry_attempts: u32,
    pub cancel: CancellationToken,
}

/// Spawns the delivery pool.
///
/// Workers stop when the cancellation token fires; the coordinator only
/// fires it after the completion tracker reports idle, so no batch can be
/// stranded in the queue.
pub(crate) fn spawn_delivery_workers(
    workers: usize,
    batch_rx: mpsc::Receiver<Batch>,
    ctx: Arc<DeliveryContext>,
) -> Vec<JoinHandle<()>> {
    let batch_rx = Arc::new(Mutex::new(batch_rx));

    (0..workers)
        .map(|_| {
            let batch_rx = Arc::clone(&batch_rx);
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                loop {
                    let batch = tokio::select! {
                        batch = async { batch_rx.lock().await.recv().await } => {
                            match batch {
                                Some(batch) => batch,
                                None => break,
                            }
                        }
                        _ = ctx.cancel.cancelled() => break,
                    };
                    handle_batch(batch, &ctx).await;
                    ctx.tracker.done();
                }
            })
        })
        .collect()
}

/// Delivers one batch and routes its residual.
///
/// Successes are counted exactly once, here and nowhere else; a document
/// retried later re-enters through a new batch and is only counted when it
/// finally lands. The residual becomes a retry batch (incremented attempt
/// count, failed documents only) or goes to the dead-letter sink once the
/// attempt ceiling is exceeded.
async fn handle_batch(batch: Batch, ctx: &DeliveryContext) {
    // Fixed pacing delay to smooth bursts against the backend.
    tokio::time::sleep(ctx.pacing_delay).await;

    let outcome = match ctx.client.bulk(&batch.documents).await {
        Ok(outcome) => outcome,
        Err(e) => {
            // Encoding failure: retrying cannot fix it, so route the whole
            // batch to the dead-letter sink rather than spin on it.
            warn!("failed to encode batch for delivery: {e}");
            let dropped = ctx.dead_letter.record(&batch, &ctx.stats).await;
            ctx.counters
                .dead_lettered
                .fetch_add(dropped, Ordering::Relaxed);
            return;
        }
    };

    if outcome.succeeded > 0 {
        ctx.counters
            .indexed
            .fetch_add(outcome.succeeded, Ordering::Relaxed);
        debug!(
            "delivered {} docs (attempt {})",
            outcome.succeeded, batch.retry_count
        );
    }

    if outcome.failed.is_empty() {
        return;
    }

    ctx.stats
        .increment_error_by(ErrorType::DocumentRejected, outcome.failed.len());
    let retry = batch.into_retry(outcome.failed);

    if ctx.max_retry_attempts > 0 && retry.retry_count > ctx.max_retry_attempts {
        let dropped = ctx.dead_letter.record(&retry, &ctx.stats).await;
        ctx.counters
            .dead_lettered
            .fetch_add(dropped, Ordering::Relaxed);
        return;
    }

    ctx.counters.retried_batches.fetch_add(1, Ordering::Relaxed);
    ctx.tracker.add(1);
    if ctx.retry_tx.send(retry).is_err() {
        warn!("retry queue closed; dropping batch");
        ctx.tracker.done();
    }
}
