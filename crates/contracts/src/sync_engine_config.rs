//! Synchronizer configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};

/// Synchronizer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncerConfig {
    /// Raise out-of-order events for secondary samples older than the
    /// oldest pending primary sample
    #[serde(default = "default_true")]
    pub out_of_order_detection_enabled: bool,

    /// Stop the syncer on the first out-of-order sample
    #[serde(default)]
    pub stop_when_out_of_order: bool,

    /// Stop the syncer when any source ring buffer fills before being drained
    #[serde(default = "default_true")]
    pub stop_when_filled_buffer: bool,

    /// Which pending primary sample a secondary sample is paired with
    #[serde(default)]
    pub pairing: PairingPolicy,

    /// How secondary sources are drained
    #[serde(default)]
    pub secondary_drain: DrainPolicy,
}

fn default_true() -> bool {
    true
}

impl Default for SyncerConfig {
    fn default() -> Self {
        Self {
            out_of_order_detection_enabled: true,
            stop_when_out_of_order: false,
            stop_when_filled_buffer: true,
            pairing: PairingPolicy::default(),
            secondary_drain: DrainPolicy::default(),
        }
    }
}

/// Primary sample selection policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingPolicy {
    /// Most recently buffered primary sample (freshest state)
    #[default]
    Latest,
    /// Primary sample closest in time to the secondary sample
    Nearest,
}

/// Secondary source drain policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainPolicy {
    /// Drain everything recorded so far (by position)
    #[default]
    All,
    /// Drain only samples not newer than the most recent primary timestamp
    UpToPrimary,
}
