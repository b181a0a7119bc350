//! Dispatch configuration and metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Dispatch queue configuration
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Channel capacity
    pub channel_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

impl DispatchConfig {
    /// Create new dispatch configuration
    pub fn new(channel_capacity: usize) -> Self {
        Self { channel_capacity }
    }
}

/// Dispatch metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Events accepted by the channel
    pub events_received: AtomicU64,

    /// Events dropped because the channel was full
    pub events_dropped: AtomicU64,

    /// Events the consumer applied successfully
    pub events_applied: AtomicU64,

    /// Events the consumer rejected with an error
    pub events_rejected: AtomicU64,

    /// Queue length observed by the consumer
    pub queue_len: AtomicUsize,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_applied(&self) {
        self.events_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.events_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Update queue length
    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            events_applied: self.events_applied.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub events_dropped: u64,
    pub events_applied: u64,
    pub events_rejected: u64,
    pub queue_len: usize,
}
