//! BufferedSensorSource trait - Buffered sensor data source abstraction
//!
//! Wraps a platform sensor: hardware callbacks accumulate into the source's own
//! ring buffer, and consumers drain it by position or by timestamp.

use crate::{Measurement, SensorType};

/// Result of recording one hardware sample into a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Stored, buffer has room left
    Stored,
    /// Stored by overwriting the oldest undrained sample
    Filled,
    /// Dropped because the source is not running
    Ignored,
}

/// Buffered sensor data source trait
///
/// Implementations are driven from a single dispatch context; `Send` lets that
/// context live on another thread, nothing here needs to be `Sync`.
///
/// # Example
///
/// ```ignore
/// let mut source: Box<dyn BufferedSensorSource> = make_source();
/// source.start(monotonic_nanos());
/// source.record(&measurement);
///
/// let mut batch = Vec::new();
/// source.measurements_before_position(source.position(), &mut batch);
/// ```
pub trait BufferedSensorSource: Send {
    /// Sensor kind produced by this source
    fn sensor_type(&self) -> SensorType;

    /// Ring buffer capacity (also the consumer-side pool capacity)
    fn capacity(&self) -> usize;

    /// Start collecting samples
    ///
    /// Returns `false` when the platform refuses to start the sensor.
    fn start(&mut self, start_timestamp: i64) -> bool;

    /// Stop collecting and discard undrained samples
    fn stop(&mut self);

    /// Check if currently collecting
    fn is_running(&self) -> bool;

    /// Write position: total number of samples recorded since start
    fn position(&self) -> u64;

    /// Store one hardware sample
    fn record(&mut self, measurement: &Measurement) -> RecordOutcome;

    /// Drain undrained samples whose position is below `position`
    ///
    /// Drained samples are appended to `out` in timestamp order.
    fn measurements_before_position(&mut self, position: u64, out: &mut Vec<Measurement>);

    /// Drain undrained samples with `timestamp <= timestamp`
    ///
    /// Drained samples are appended to `out` in timestamp order.
    fn measurements_before_timestamp(&mut self, timestamp: i64, out: &mut Vec<Measurement>);
}
