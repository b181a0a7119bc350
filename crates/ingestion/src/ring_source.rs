//! Ring-buffer backed sensor source
//!
//! Hardware callbacks are recorded into a fixed-size `HeapRb`; each entry
//! carries its write position so consumers can drain by position or by
//! timestamp. When the ring is full the oldest undrained entry is overwritten
//! and the write reports [`RecordOutcome::Filled`].

use std::fmt;

use contracts::{BufferedSensorSource, Measurement, RecordOutcome, SensorType};
use ringbuf::{traits::*, HeapRb};
use tracing::{debug, trace};

/// Ring entry: measurement plus its write position
#[derive(Debug, Clone)]
struct Entry {
    position: u64,
    measurement: Measurement,
}

/// Buffered sensor source backed by a ring buffer
pub struct RingBufferSource {
    sensor_type: SensorType,
    ring: HeapRb<Entry>,
    capacity: usize,
    running: bool,
    start_timestamp: i64,
    position: u64,
    overwritten: u64,
}

impl fmt::Debug for RingBufferSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBufferSource")
            .field("sensor_type", &self.sensor_type)
            .field("len", &self.ring.occupied_len())
            .field("capacity", &self.capacity)
            .field("position", &self.position)
            .field("overwritten", &self.overwritten)
            .finish()
    }
}

impl RingBufferSource {
    /// Create a stopped source; `capacity` of zero is raised to one
    pub fn new(sensor_type: SensorType, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            sensor_type,
            ring: HeapRb::new(capacity),
            capacity,
            running: false,
            start_timestamp: 0,
            position: 0,
            overwritten: 0,
        }
    }

    /// Undrained entries
    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Entries lost to overwrite since start
    pub fn overwritten_count(&self) -> u64 {
        self.overwritten
    }

    /// Pop the first `count` entries into `out`
    fn pop_into(&mut self, count: usize, out: &mut Vec<Measurement>) {
        out.extend(self.ring.pop_iter().take(count).map(|e| e.measurement));
    }
}

impl BufferedSensorSource for RingBufferSource {
    fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn start(&mut self, start_timestamp: i64) -> bool {
        let _ = self.ring.pop_iter().count();
        self.position = 0;
        self.overwritten = 0;
        self.start_timestamp = start_timestamp;
        self.running = true;
        debug!(sensor_type = %self.sensor_type, start_timestamp, "ring source started");
        true
    }

    fn stop(&mut self) {
        let discarded = self.ring.pop_iter().count();
        self.running = false;
        debug!(sensor_type = %self.sensor_type, discarded, "ring source stopped");
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn record(&mut self, measurement: &Measurement) -> RecordOutcome {
        if !self.running || measurement.timestamp < self.start_timestamp {
            return RecordOutcome::Ignored;
        }

        let mut outcome = RecordOutcome::Stored;
        if self.ring.is_full() {
            if let Some(old) = self.ring.try_pop() {
                trace!(
                    sensor_type = %self.sensor_type,
                    position = old.position,
                    "ring source overwrote undrained sample"
                );
            }
            self.overwritten += 1;
            outcome = RecordOutcome::Filled;
        }

        let entry = Entry {
            position: self.position,
            measurement: measurement.clone(),
        };
        // Cannot fail: a slot was freed above when the ring was full
        let _ = self.ring.try_push(entry);
        self.position += 1;
        outcome
    }

    fn measurements_before_position(&mut self, position: u64, out: &mut Vec<Measurement>) {
        let count = self
            .ring
            .iter()
            .take_while(|e| e.position < position)
            .count();
        self.pop_into(count, out);
    }

    fn measurements_before_timestamp(&mut self, timestamp: i64, out: &mut Vec<Measurement>) {
        let count = self
            .ring
            .iter()
            .take_while(|e| e.measurement.timestamp <= timestamp)
            .count();
        self.pop_into(count, out);
    }
}
