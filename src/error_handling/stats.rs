//! Processing statistics tracking.
//!
//! This module provides thread-safe statistics tracking for errors and
//! warnings during pipeline processing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::info;
use strum::IntoEnumIterator;

use super::types::{ErrorType, WarningType};

/// Thread-safe processing statistics tracker.
///
/// Tracks errors and warnings using atomic counters, allowing concurrent
/// access from multiple tasks. All types are initialized to zero on creation.
///
/// - **Errors**: records lost or documents rejected
/// - **Warnings**: expected partial-data conditions (document still delivered)
///
/// Share across tasks with `Arc`.
pub struct ProcessingStats {
    errors: HashMap<ErrorType, AtomicUsize>,
    warnings: HashMap<WarningType, AtomicUsize>,
}

impl ProcessingStats {
    pub fn new() -> Self {
        let mut errors = HashMap::new();
        for error in ErrorType::iter() {
            errors.insert(error, AtomicUsize::new(0));
        }

        let mut warnings = HashMap::new();
        for warning in WarningType::iter() {
            warnings.insert(warning, AtomicUsize::new(0));
        }

        ProcessingStats { errors, warnings }
    }

    /// Increment an error counter.
    pub fn increment_error(&self, error: ErrorType) {
        self.increment_error_by(error, 1);
    }

    /// Increment an error counter by `n` (used for per-document rejection
    /// counts within a batch).
    ///
    /// All counter types are initialized in the constructor; a missing entry
    /// indicates a bug in initialization and is logged rather than panicking.
    pub fn increment_error_by(&self, error: ErrorType, n: usize) {
        if let Some(counter) = self.errors.get(&error) {
            counter.fetch_add(n, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment error counter for {:?} which is not in the map. \
                 This indicates a bug in ProcessingStats initialization.",
                error
            );
        }
    }

    /// Increment a warning counter.
    pub fn increment_warning(&self, warning: WarningType) {
        if let Some(counter) = self.warnings.get(&warning) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment warning counter for {:?} which is not in the map. \
                 This indicates a bug in ProcessingStats initialization.",
                warning
            );
        }
    }

    /// Current count for an error type.
    pub fn get_error_count(&self, error: ErrorType) -> usize {
        self.errors
            .get(&error)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Current count for a warning type.
    pub fn get_warning_count(&self, warning: WarningType) -> usize {
        self.warnings
            .get(&warning)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Total errors across all types.
    pub fn total_errors(&self) -> usize {
        self.errors
            .values()
            .map(|c| c.load(Ordering::Relaxed))
            .sum()
    }

    /// Total warnings across all types.
    pub fn total_warnings(&self) -> usize {
        self.warnings
            .values()
            .map(|c| c.load(Ordering::Relaxed))
            .sum()
    }

    /// Logs nonzero error and warning counts at the end of a run.
    pub fn log_summary(&self) {
        let total_errors = self.total_errors();
        let total_warnings = self.total_warnings();

        if total_errors > 0 {
            info!("Error counts ({} total):", total_errors);
            for error_type in ErrorType::iter() {
                let count = self.get_error_count(error_type);
                if count > 0 {
                    info!("   {}: {}", error_type.as_str(), count);
                }
            }
        }

        if total_warnings > 0 {
            info!("Warning counts ({} total):", total_warnings);
            for warning_type in WarningType::iter() {
                let count = self.get_warning_count(warning_type);
                if count > 0 {
                    info!("   {}: {}", warning_type.as_str(), count);
                }
            }
        }
    }
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let stats = ProcessingStats::new();
        assert_eq!(stats.total_errors(), 0);
        assert_eq!(stats.total_warnings(), 0);
    }

    #[test]
    fn test_increment_error() {
        let stats = ProcessingStats::new();
        stats.increment_error(ErrorType::ParseLine);
        stats.increment_error(ErrorType::ParseLine);
        stats.increment_error(ErrorType::InvalidPrefix);
        assert_eq!(stats.get_error_count(ErrorType::ParseLine), 2);
        assert_eq!(stats.get_error_count(ErrorType::InvalidPrefix), 1);
        assert_eq!(stats.total_errors(), 3);
    }

    #[test]
    fn test_increment_error_by() {
        let stats = ProcessingStats::new();
        stats.increment_error_by(ErrorType::DocumentRejected, 17);
        assert_eq!(stats.get_error_count(ErrorType::DocumentRejected), 17);
    }

    #[test]
    fn test_increment_warning() {
        let stats = ProcessingStats::new();
        stats.increment_warning(WarningType::AsnDescriptionMissing);
        assert_eq!(
            stats.get_warning_count(WarningType::AsnDescriptionMissing),
            1
        );
        assert_eq!(stats.get_warning_count(WarningType::CountryCodeMissing), 0);
    }

    #[test]
    fn test_concurrent_increments() {
        use std::sync::Arc;

        let stats = Arc::new(ProcessingStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.increment_error(ErrorType::DocumentRejected);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(stats.get_error_count(ErrorType::DocumentRejected), 8000);
    }
}
