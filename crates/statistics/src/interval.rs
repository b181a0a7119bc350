//! Time-interval estimator for inter-sample spacing.

use serde::{Deserialize, Serialize};

use crate::running::RunningStats;

/// Running mean/variance of sampling intervals (seconds)
///
/// Stops accepting samples once `cap` intervals have been recorded. An
/// unbounded estimator has no cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeIntervalEstimator {
    stats: RunningStats,
    cap: Option<u64>,
}

impl TimeIntervalEstimator {
    /// Create an estimator accepting at most `cap` intervals
    pub fn new(cap: Option<u64>) -> Self {
        Self {
            stats: RunningStats::default(),
            cap,
        }
    }

    /// Record one interval in seconds
    ///
    /// Returns `false` when the cap has been reached and the interval was
    /// discarded.
    #[inline]
    pub fn push(&mut self, interval_seconds: f64) -> bool {
        if self.is_full() {
            return false;
        }
        self.stats.push(interval_seconds);
        true
    }

    /// Clear recorded intervals and install a new cap
    pub fn reset(&mut self, cap: Option<u64>) {
        self.stats.reset();
        self.cap = cap;
    }

    /// Whether the cap has been reached
    pub fn is_full(&self) -> bool {
        self.cap.is_some_and(|cap| self.stats.count() >= cap)
    }

    /// Configured cap
    pub fn cap(&self) -> Option<u64> {
        self.cap
    }

    /// Recorded intervals
    pub fn count(&self) -> u64 {
        self.stats.count()
    }

    /// Mean interval (s)
    pub fn average(&self) -> f64 {
        self.stats.mean()
    }

    /// Interval variance (s²)
    pub fn variance(&self) -> f64 {
        self.stats.variance()
    }

    /// Interval standard deviation (s)
    pub fn std_dev(&self) -> f64 {
        self.stats.std_dev()
    }
}
