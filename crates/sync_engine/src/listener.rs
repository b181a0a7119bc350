//! Synchronizer event listener.

use contracts::{Measurement, SensorAccuracy, SensorType, SyncedMeasurement, SyncerStatus};

/// Receives synchronizer events
///
/// Every method has a no-op default, so implementors only override what they
/// consume. Callbacks run synchronously inside the synchronizer call that
/// triggered them.
pub trait SyncListener: Send {
    /// A source reported an accuracy change
    fn on_accuracy_changed(
        &mut self,
        _status: &SyncerStatus,
        _sensor_type: SensorType,
        _accuracy: SensorAccuracy,
    ) {
    }

    /// A source ring buffer filled before it was drained
    fn on_buffer_filled(&mut self, _status: &SyncerStatus, _sensor_type: SensorType) {}

    /// A secondary sample is older than the oldest pending primary sample
    fn on_out_of_order_measurement(
        &mut self,
        _status: &SyncerStatus,
        _sensor_type: SensorType,
        _measurement: &Measurement,
    ) {
    }

    /// A composite measurement was produced
    fn on_synced_measurement(&mut self, _status: &SyncerStatus, _synced: &SyncedMeasurement<'_>) {
    }
}

/// Listener that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl SyncListener for NoopListener {}
