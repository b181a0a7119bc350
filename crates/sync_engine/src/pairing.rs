//! Primary sample selection strategies.
//!
//! The merge step pairs each qualifying secondary sample with one pending
//! primary sample; which one is decided here.

use contracts::{Measurement, PairingPolicy};

use crate::buffer::StreamBuffer;

/// Picks the pending primary sample a secondary sample is paired with
pub trait PairingStrategy: Send {
    /// Index into `primaries` (0 = oldest), or `None` when nothing is pending
    fn select(&self, primaries: &StreamBuffer, secondary: &Measurement) -> Option<usize>;

    /// Name used in logs
    fn name(&self) -> &'static str;
}

/// Pair with the most recently buffered primary sample
///
/// Presents the freshest known primary state, trading exact timestamp
/// alignment for recency.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestPrimary;

impl PairingStrategy for LatestPrimary {
    #[inline]
    fn select(&self, primaries: &StreamBuffer, _secondary: &Measurement) -> Option<usize> {
        primaries.len().checked_sub(1)
    }

    fn name(&self) -> &'static str {
        "latest"
    }
}

/// Pair with the primary sample closest in time
///
/// Ties resolve to the newer primary sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestPrimary;

impl PairingStrategy for NearestPrimary {
    fn select(&self, primaries: &StreamBuffer, secondary: &Measurement) -> Option<usize> {
        let target = secondary.timestamp;
        let mut best: Option<(usize, u64)> = None;

        for (index, primary) in primaries.iter().enumerate() {
            let distance = primary.timestamp.abs_diff(target);
            match best {
                Some((_, best_distance)) if distance > best_distance => {}
                _ => best = Some((index, distance)),
            }
        }

        best.map(|(index, _)| index)
    }

    fn name(&self) -> &'static str {
        "nearest"
    }
}

/// Strategy for a configured policy
pub fn strategy_for(policy: PairingPolicy) -> Box<dyn PairingStrategy> {
    match policy {
        PairingPolicy::Latest => Box::new(LatestPrimary),
        PairingPolicy::Nearest => Box::new(NearestPrimary),
    }
}
