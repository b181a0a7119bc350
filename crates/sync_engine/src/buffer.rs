//! Per-stream pending queue backed by a measurement pool.
//!
//! Uses index-based separation:
//! - VecDeque stores lightweight pool slots in FIFO order
//! - MeasurementPool stores the actual records
//!
//! Batches are copied into pool-owned records, so the source may overwrite its
//! ring buffer freely after a drain. Timestamps strictly increase within one
//! stream: a record not newer than the last accepted one is skipped, which
//! makes re-delivering a batch a no-op.

use std::collections::VecDeque;
use std::fmt;

use contracts::{BufferStats, Measurement, SensorType};

use crate::pool::{MeasurementPool, PoolSlot};

/// Per-stream FIFO of copied measurements awaiting merge
///
/// Invariant: `available() + len() == capacity()` at all times.
pub struct StreamBuffer {
    sensor_type: SensorType,
    /// Pending slots, oldest first
    pending: VecDeque<PoolSlot>,
    /// Record storage
    pool: MeasurementPool,
    /// Pending entries overwritten because a batch exceeded free slots
    recycled: u64,
    /// Records skipped as not newer than `last_accepted`
    skipped: u64,
    /// Newest timestamp ever copied in, consumed or not
    last_accepted: Option<i64>,
}

/// Outcome of one [`StreamBuffer::copy_batch`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchCopy {
    /// Records copied into the queue
    pub copied: usize,
    /// Pending records recycled to make room
    pub recycled: usize,
    /// Stale or repeated records ignored
    pub skipped: usize,
}

impl fmt::Debug for StreamBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBuffer")
            .field("sensor_type", &self.sensor_type)
            .field("pending", &self.pending.len())
            .field("capacity", &self.pool.capacity())
            .field("recycled", &self.recycled)
            .field("last_accepted", &self.last_accepted)
            .finish()
    }
}

impl StreamBuffer {
    /// Create a new stream buffer
    pub fn new(sensor_type: SensorType, capacity: usize) -> Self {
        Self {
            sensor_type,
            pending: VecDeque::with_capacity(capacity),
            pool: MeasurementPool::new(sensor_type, capacity),
            recycled: 0,
            skipped: 0,
            last_accepted: None,
        }
    }

    /// Copy a drained batch to the back of the queue
    ///
    /// Records whose timestamp is not newer than the last accepted one are
    /// skipped. When the pool runs dry the oldest pending record is recycled.
    pub fn copy_batch(&mut self, batch: &[Measurement]) -> BatchCopy {
        let mut outcome = BatchCopy::default();

        for measurement in batch {
            if self
                .last_accepted
                .is_some_and(|last| measurement.timestamp <= last)
            {
                outcome.skipped += 1;
                continue;
            }
            let slot = match self.pool.acquire() {
                Some(slot) => slot,
                None => match self.pending.pop_front() {
                    Some(oldest) => {
                        outcome.recycled += 1;
                        oldest
                    }
                    // Zero-capacity stream
                    None => break,
                },
            };
            self.pool.get_mut(&slot).copy_from(measurement);
            self.pending.push_back(slot);
            self.last_accepted = Some(measurement.timestamp);
            outcome.copied += 1;
        }

        self.recycled += outcome.recycled as u64;
        self.skipped += outcome.skipped as u64;
        debug_assert_eq!(self.pool.available() + self.pending.len(), self.capacity());
        outcome
    }

    /// Oldest pending record
    #[inline]
    pub fn front(&self) -> Option<&Measurement> {
        self.pending.front().map(|slot| self.pool.get(slot))
    }

    /// Newest pending record
    #[inline]
    pub fn back(&self) -> Option<&Measurement> {
        self.pending.back().map(|slot| self.pool.get(slot))
    }

    /// Iterate pending records, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Measurement> + '_ {
        self.pending.iter().map(|slot| self.pool.get(slot))
    }

    /// Detach the oldest pending slot
    ///
    /// The slot stays checked out until passed to [`StreamBuffer::release`].
    #[inline]
    pub fn take_front(&mut self) -> Option<PoolSlot> {
        self.pending.pop_front()
    }

    /// Detach the pending slot at `index` (0 = oldest)
    #[inline]
    pub fn take_at(&mut self, index: usize) -> Option<PoolSlot> {
        self.pending.remove(index)
    }

    /// Read a detached slot
    #[inline]
    pub fn get(&self, slot: &PoolSlot) -> &Measurement {
        self.pool.get(slot)
    }

    /// Return a detached slot to the pool
    #[inline]
    pub fn release(&mut self, slot: PoolSlot) {
        self.pool.release(slot);
    }

    /// Return every pending record to the pool and forget the last timestamp
    pub fn clear(&mut self) {
        while let Some(slot) = self.pending.pop_front() {
            self.pool.release(slot);
        }
        self.last_accepted = None;
    }

    /// Sensor kind of this stream
    #[inline]
    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    /// Number of pending records
    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing is pending
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Free pool slots
    #[inline]
    pub fn available(&self) -> usize {
        self.pool.available()
    }

    /// Configured capacity
    #[inline]
    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Total recycled records
    #[inline]
    pub fn recycled_count(&self) -> u64 {
        self.recycled
    }

    /// Total records skipped as stale or repeated
    #[inline]
    pub fn skipped_count(&self) -> u64 {
        self.skipped
    }

    /// Newest timestamp accepted since the last [`StreamBuffer::clear`]
    #[inline]
    pub fn last_accepted(&self) -> Option<i64> {
        self.last_accepted
    }

    /// Diagnostics snapshot
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            sensor_type: Some(self.sensor_type),
            available: self.available(),
            pending: self.len(),
            capacity: self.capacity(),
            recycled: self.recycled,
            oldest_timestamp: self.front().map(|m| m.timestamp),
            newest_timestamp: self.back().map(|m| m.timestamp),
        }
    }
}
