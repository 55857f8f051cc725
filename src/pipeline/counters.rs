//! Run-level counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters shared by all stages, snapshotted for progress logging
/// and the final report.
#[derive(Default)]
pub struct RunCounters {
    /// Records parsed successfully from chunk files.
    pub records: AtomicU64,
    /// Documents accepted by the backend.
    pub indexed: AtomicU64,
    /// Lines skipped because they were not valid JSON.
    pub parse_failures: AtomicU64,
    /// Records skipped because their CIDR could not be parsed.
    pub invalid_prefixes: AtomicU64,
    /// Hand-offs to the retry stage, one per failed delivery attempt.
    pub retried_batches: AtomicU64,
    /// Documents dropped to the dead-letter sink.
    pub dead_lettered: AtomicU64,
}

/// Plain-number view of [`RunCounters`] at one moment.
#[derive(Debug, Clone, Copy)]
pub struct CounterSnapshot {
    pub records: u64,
    pub indexed: u64,
    pub parse_failures: u64,
    pub invalid_prefixes: u64,
    pub retried_batches: u64,
    pub dead_lettered: u64,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            records: self.records.load(Ordering::Relaxed),
            indexed: self.indexed.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            invalid_prefixes: self.invalid_prefixes.load(Ordering::Relaxed),
            retried_batches: self.retried_batches.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
        }
    }
}
