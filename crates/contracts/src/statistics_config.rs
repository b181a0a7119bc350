//! Accumulated statistics configuration contracts.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ContractError;

/// Default number of samples per acquisition window
pub const DEFAULT_MAX_SAMPLES: i64 = 1000;

/// Default acquisition window duration (ms)
pub const DEFAULT_MAX_DURATION_MILLIS: i64 = 1000;

/// Condition that closes an acquisition window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopMode {
    /// Complete after `max_samples` measurements
    MaxSamplesOnly,
    /// Complete once `max_duration_millis` of measurement time has elapsed
    MaxDurationOnly,
    /// Complete on whichever limit is reached first
    #[default]
    MaxSamplesOrDuration,
}

impl StopMode {
    /// Whether the sample limit participates in completion
    pub fn uses_samples(self) -> bool {
        matches!(self, Self::MaxSamplesOnly | Self::MaxSamplesOrDuration)
    }

    /// Whether the duration limit participates in completion
    pub fn uses_duration(self) -> bool {
        matches!(self, Self::MaxDurationOnly | Self::MaxSamplesOrDuration)
    }
}

/// Accumulated statistics configuration
///
/// Limits are signed so that negative values coming from configuration files
/// are rejected explicitly instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct StatisticsConfig {
    /// Sample limit
    #[serde(default = "default_max_samples")]
    #[validate(range(min = 0, message = "must be >= 0"))]
    pub max_samples: i64,

    /// Duration limit in milliseconds of measurement time
    #[serde(default = "default_max_duration_millis")]
    #[validate(range(min = 0, message = "must be >= 0"))]
    pub max_duration_millis: i64,

    /// Stop mode
    #[serde(default)]
    pub stop_mode: StopMode,
}

fn default_max_samples() -> i64 {
    DEFAULT_MAX_SAMPLES
}

fn default_max_duration_millis() -> i64 {
    DEFAULT_MAX_DURATION_MILLIS
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            max_samples: DEFAULT_MAX_SAMPLES,
            max_duration_millis: DEFAULT_MAX_DURATION_MILLIS,
            stop_mode: StopMode::default(),
        }
    }
}

impl StatisticsConfig {
    /// Validate limits, reporting the first offending field
    ///
    /// # Errors
    /// `ContractError::InvalidArgument` when a limit is negative.
    pub fn check(&self) -> Result<(), ContractError> {
        self.validate().map_err(|errors| {
            let mut fields: Vec<(String, String)> = errors
                .field_errors()
                .into_iter()
                .map(|(field, errs)| {
                    let message = errs
                        .first()
                        .and_then(|e| e.message.as_deref())
                        .unwrap_or("invalid value")
                        .to_string();
                    (field.to_string(), message)
                })
                .collect();
            fields.sort();

            match fields.into_iter().next() {
                Some((field, message)) => ContractError::invalid_argument(field, message),
                None => ContractError::invalid_argument("statistics", "invalid configuration"),
            }
        })
    }

    /// Duration limit in nanoseconds
    pub fn max_duration_nanos(&self) -> i64 {
        self.max_duration_millis
            .saturating_mul(crate::NANOS_PER_MILLI)
    }
}
