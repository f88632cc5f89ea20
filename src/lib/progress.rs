//! Progress tracking utilities
//!
//! Provides a progress tracker for logging record counts at regular
//! intervals while a long-running stream is consumed.

use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

/// Progress tracker for logging progress at regular intervals.
///
/// Maintains an internal count and logs progress messages when the count
/// crosses interval boundaries.
///
/// # Example
/// ```
/// use gamsort_lib::progress::ProgressTracker;
///
/// let tracker = ProgressTracker::new("Read records").with_interval(100);
///
/// for _ in 0..250 {
///     tracker.log_if_needed(1); // Logs at 100, 200
/// }
/// tracker.log_final(); // Logs "Read records 250 (complete)"
/// ```
pub struct ProgressTracker {
    /// The logging interval - progress is logged when count crosses multiples of this.
    interval: u64,
    /// Message prefix for log output.
    message: String,
    /// Internal count of items processed.
    count: AtomicU64,
}

impl ProgressTracker {
    /// Creates a new progress tracker with the specified message and a
    /// default interval of 10,000.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { interval: 10_000, message: message.into(), count: AtomicU64::new(0) }
    }

    /// Sets the logging interval.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval;
        self
    }

    /// Adds to the count and logs for each interval boundary crossed.
    ///
    /// Returns `true` if the new count is exactly a multiple of the
    /// interval, which `log_final` uses to avoid a duplicate final message.
    pub fn log_if_needed(&self, additional: u64) -> bool {
        if additional == 0 {
            let count = self.count.load(Ordering::Relaxed);
            return count > 0 && count % self.interval == 0;
        }

        let prev = self.count.fetch_add(additional, Ordering::Relaxed);
        let new_count = prev + additional;

        let prev_intervals = prev / self.interval;
        let new_intervals = new_count / self.interval;
        for i in (prev_intervals + 1)..=new_intervals {
            info!("{} {}", self.message, i * self.interval);
        }

        new_count % self.interval == 0
    }

    /// Logs the final count unless the last `log_if_needed` already did.
    pub fn log_final(&self) {
        if !self.log_if_needed(0) {
            let count = self.count.load(Ordering::Relaxed);
            if count > 0 {
                info!("{} {} (complete)", self.message, count);
            }
        }
    }

    /// Current count of items processed.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_tracker_new() {
        let tracker = ProgressTracker::new("Processing");
        assert_eq!(tracker.interval, 10_000);
        assert_eq!(tracker.count(), 0);
    }

    #[test]
    fn test_log_if_needed_returns_correctly() {
        let tracker = ProgressTracker::new("Test").with_interval(10);

        assert!(!tracker.log_if_needed(5)); // count=5
        assert!(!tracker.log_if_needed(3)); // count=8
        assert!(tracker.log_if_needed(2)); // count=10, exactly on interval
        assert!(!tracker.log_if_needed(5)); // count=15
        assert!(!tracker.log_if_needed(10)); // count=25, crossed 20
    }

    #[test]
    fn test_log_if_needed_zero() {
        let tracker = ProgressTracker::new("Test").with_interval(10);

        assert!(!tracker.log_if_needed(0));
        tracker.log_if_needed(10);
        assert!(tracker.log_if_needed(0)); // count=10
        tracker.log_if_needed(5);
        assert!(!tracker.log_if_needed(0)); // count=15
    }

    #[test]
    fn test_count() {
        let tracker = ProgressTracker::new("Test").with_interval(100);
        tracker.log_if_needed(42);
        tracker.log_if_needed(8);
        assert_eq!(tracker.count(), 50);
    }

    #[test]
    fn test_log_final() {
        let tracker = ProgressTracker::new("Test").with_interval(10);
        tracker.log_if_needed(25);
        tracker.log_final();
    }
}
