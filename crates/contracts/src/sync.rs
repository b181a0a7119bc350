//! SyncedMeasurement - Synchronizer output
//!
//! Composite measurement data structures.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Measurement, SensorType};

/// Input stream of a synchronizer
///
/// One primary stream acts as the clock; secondary streams are indexed in
/// registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamId {
    Primary,
    Secondary(usize),
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary(index) => write!(f, "secondary[{index}]"),
        }
    }
}

/// Synchronized measurement
///
/// Borrows both samples from the synchronizer; valid only for the duration of
/// the listener callback it is handed to. Copy what must outlive the call.
#[derive(Debug, Clone, Copy)]
pub struct SyncedMeasurement<'a> {
    /// Sync timestamp (the secondary sample's timestamp, ns)
    pub timestamp: i64,

    /// Emission sequence number (monotonically increasing, starts at 1)
    pub sequence: u64,

    /// Primary (clock) stream sample
    pub primary: &'a Measurement,

    /// Secondary stream sample
    pub secondary: &'a Measurement,

    /// Index of the secondary stream `secondary` came from
    pub secondary_index: usize,
}

impl SyncedMeasurement<'_> {
    /// Signed offset `primary.timestamp - secondary.timestamp` (ns)
    ///
    /// Positive when the paired primary sample is newer than the secondary one.
    pub fn alignment_offset(&self) -> i64 {
        self.primary.timestamp - self.secondary.timestamp
    }

    /// Owned copy of the pair, for consumers that need to keep it
    pub fn to_owned_pair(&self) -> (Measurement, Measurement) {
        (self.primary.clone(), self.secondary.clone())
    }
}

/// Snapshot of synchronizer state handed to listeners
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncerStatus {
    /// Whether the syncer is accepting batches
    pub running: bool,

    /// Number of synced measurements emitted since start
    pub processed: u64,

    /// Oldest pending primary timestamp
    pub oldest_timestamp: Option<i64>,

    /// Most recent primary timestamp seen
    pub most_recent_timestamp: Option<i64>,
}

/// Per-stream buffer status (for diagnostics)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Sensor kind of the stream
    pub sensor_type: Option<SensorType>,

    /// Free pool slots
    pub available: usize,

    /// Measurements queued for merge
    pub pending: usize,

    /// Configured capacity (available + pending)
    pub capacity: usize,

    /// Pending entries recycled because a batch exceeded free slots
    pub recycled: u64,

    /// Oldest pending timestamp
    pub oldest_timestamp: Option<i64>,

    /// Newest pending timestamp
    pub newest_timestamp: Option<i64>,
}
