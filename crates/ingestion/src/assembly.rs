//! Build consumers from a `FusionBlueprint`
//!
//! Every configured stream gets a [`RingBufferSource`] sized by its
//! `capacity`; the first stream is the primary clock.

use contracts::{BufferedSensorSource, ContractError, FusionBlueprint, StreamConfig};
use statistics::{StatisticsEstimator, StatisticsListener};
use sync_engine::{SyncListener, Synchronizer};
use tracing::{debug, instrument};

use crate::ring_source::RingBufferSource;

fn ring_source(stream: &StreamConfig) -> Box<dyn BufferedSensorSource> {
    Box::new(RingBufferSource::new(stream.sensor_type, stream.capacity))
}

/// Synchronizer over all blueprint streams
///
/// # Errors
/// `ConfigValidation` when the blueprint has fewer than two streams.
#[instrument(name = "assemble_synchronizer", skip_all, fields(streams = blueprint.streams.len()))]
pub fn synchronizer_from_blueprint(
    blueprint: &FusionBlueprint,
    listener: Box<dyn SyncListener>,
) -> Result<Synchronizer, ContractError> {
    let primary = blueprint
        .primary()
        .ok_or_else(|| ContractError::config_validation("streams", "no primary stream"))?;
    let secondaries = blueprint.secondaries().iter().map(ring_source).collect();

    debug!(primary = %primary.sensor_type, "assembling synchronizer");
    Synchronizer::new(
        blueprint.syncer.clone(),
        ring_source(primary),
        secondaries,
        listener,
    )
}

/// Statistics estimator over the blueprint's primary stream
///
/// # Errors
/// - `ConfigValidation` when the blueprint has no streams
/// - `InvalidArgument` when the statistics bounds are negative
pub fn estimator_from_blueprint(
    blueprint: &FusionBlueprint,
    listener: Box<dyn StatisticsListener>,
) -> Result<StatisticsEstimator, ContractError> {
    let primary = blueprint
        .primary()
        .ok_or_else(|| ContractError::config_validation("streams", "no primary stream"))?;
    StatisticsEstimator::new(blueprint.statistics, ring_source(primary), listener)
}
