//! Completion tracking for in-flight work.

use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::Notify;

/// Shared counter of outstanding units of work across all stages.
///
/// One unit per seeded chunk file and one per batch in delivery or retry
/// flight. The accounting discipline that keeps the count honest:
///
/// - increment BEFORE handing a unit to the next queue;
/// - a stage that produces a downstream unit increments for it before
///   decrementing its own, so the count never touches zero while work is
///   still moving;
/// - decrement exactly once when a unit's handling completes.
///
/// The coordinator blocks on [`CompletionTracker::wait_idle`]; zero means
/// every file has been read, every batch attempted, and no retry is in
/// flight, so the stage queues can be torn down safely.
pub struct CompletionTracker {
    outstanding: AtomicI64,
    idle: Notify,
}

impl CompletionTracker {
    pub fn new() -> Self {
        CompletionTracker {
            outstanding: AtomicI64::new(0),
            idle: Notify::new(),
        }
    }

    /// Registers `n` new units of in-flight work.
    pub fn add(&self, n: i64) {
        self.outstanding.fetch_add(n, Ordering::AcqRel);
    }

    /// Marks one unit complete, waking waiters if this was the last one.
    pub fn done(&self) {
        let prev = self.outstanding.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "completion tracker went negative");
        if prev == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Current number of outstanding units.
    pub fn outstanding(&self) -> i64 {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Waits until the outstanding count reaches zero.
    ///
    /// The notified future is created before the count is checked, so a
    /// `done` racing with this call cannot be missed.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::new()
    }
}
