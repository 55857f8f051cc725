//! Retry workers: backoff and re-enqueue.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::Batch;
use crate::pipeline::tracker::CompletionTracker;

/// Shared state for the retry pool.
pub(crate) struct RetryContext {
    pub delivery_tx: mpsc::Sender<Batch>,
    pub tracker: Arc<CompletionTracker>,
    pub backoff_base: Duration,
    pub backoff_growth_cap: u32,
    pub cancel: CancellationToken,
}

/// Linear backoff: `base * retry_count`, with growth capped so the delay
/// stops increasing past `growth_cap` attempts.
pub(crate) fn backoff_delay(base: Duration, growth_cap: u32, retry_count: u32) -> Duration {
    base * retry_count.clamp(1, growth_cap.max(1))
}

/// Spawns the retry pool.
///
/// The retry queue is unbounded on purpose: delivery workers must be able
/// to hand off a residual without blocking, otherwise delivery and retry
/// could each be stuck pushing into the other's full queue. Back-pressure
/// on the whole system still comes from the bounded delivery queue.
pub(crate) fn spawn_retry_workers(
    workers: usize,
    retry_rx: mpsc::UnboundedReceiver<Batch>,
    ctx: Arc<RetryContext>,
) -> Vec<JoinHandle<()>> {
    let retry_rx = Arc::new(Mutex::new(retry_rx));

    (0..workers)
        .map(|_| {
            let retry_rx = Arc::clone(&retry_rx);
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                loop {
                    let batch = tokio::select! {
                        batch = async { retry_rx.lock().await.recv().await } => {
                            match batch {
                                Some(batch) => batch,
                                None => break,
                            }
                        }
                        _ = ctx.cancel.cancelled() => break,
                    };
                    reschedule(batch, &ctx).await;
                    ctx.tracker.done();
                }
            })
        })
        .collect()
}

/// Waits out the batch's backoff delay and puts it back on the delivery
/// queue. Every retry is logged with the attempt number and the prefixes
/// involved, for operational diagnosis of persistently failing documents.
async fn reschedule(batch: Batch, ctx: &RetryContext) {
    let delay = backoff_delay(ctx.backoff_base, ctx.backoff_growth_cap, batch.retry_count);
    info!(
        "retry #{} for {} docs in {:.1}s: prefixes {:?}",
        batch.retry_count,
        batch.documents.len(),
        delay.as_secs_f64(),
        batch.prefixes()
    );
    tokio::time::sleep(delay).await;

    ctx.tracker.add(1);
    if ctx.delivery_tx.send(batch).await.is_err() {
        warn!("delivery queue closed; dropping retried batch");
        ctx.tracker.done();
    }
}
