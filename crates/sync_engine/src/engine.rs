//! Main synchronizer implementation.

use std::iter;

use contracts::{
    monotonic_nanos, BufferStats, BufferedSensorSource, ContractError, DrainPolicy, Measurement,
    RecordOutcome, SensorAccuracy, SensorType, StreamId, SyncedMeasurement, SyncerConfig,
    SyncerStatus,
};
use tracing::{debug, info, instrument, warn};

use crate::buffer::{BatchCopy, StreamBuffer};
use crate::listener::SyncListener;
use crate::pairing::{strategy_for, PairingStrategy};

/// One input stream: the collaborator source plus its pending queue
struct Stream {
    source: Box<dyn BufferedSensorSource>,
    buffer: StreamBuffer,
}

impl Stream {
    fn new(source: Box<dyn BufferedSensorSource>) -> Self {
        let buffer = StreamBuffer::new(source.sensor_type(), source.capacity());
        Self { source, buffer }
    }
}

/// How a merge pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeOutcome {
    /// Queue exhausted or remaining entries are newer than the primary stream
    Idle,
    /// Stop-on-out-of-order policy fired
    Halted,
}

/// Multi-stream measurement synchronizer
///
/// One primary stream acts as the clock. Each secondary stream is gated by the
/// most recent primary timestamp: a secondary sample is merged only once the
/// primary stream has caught up with it.
///
/// All entry points take `&mut self`; callers funnel callbacks from different
/// sensor threads through one dispatch context.
pub struct Synchronizer {
    /// Configuration
    config: SyncerConfig,
    /// Primary (clock) stream
    primary: Stream,
    /// Secondary streams, in registration order
    secondaries: Vec<Stream>,
    /// Event sink
    listener: Box<dyn SyncListener>,
    /// Primary selection policy
    strategy: Box<dyn PairingStrategy>,
    /// Accepting batches
    running: bool,
    /// Timestamp passed to the sources on start
    start_timestamp: Option<i64>,
    /// Timestamp of the oldest pending primary sample
    oldest_timestamp: Option<i64>,
    /// Timestamp of the newest primary sample seen
    most_recent_timestamp: Option<i64>,
    /// Copy of the last consumed primary sample
    last_primary: Option<Measurement>,
    /// Synced measurements emitted since start
    processed: u64,
    /// Reused drain buffer
    scratch: Vec<Measurement>,
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("running", &self.running)
            .field("primary", &self.primary.buffer)
            .field("secondaries", &self.secondaries.len())
            .field("strategy", &self.strategy.name())
            .field("processed", &self.processed)
            .finish()
    }
}

impl Synchronizer {
    /// Create a synchronizer over one primary and at least one secondary source
    ///
    /// Each stream's pool capacity is taken from its source's capacity.
    ///
    /// # Errors
    /// `ConfigValidation` when `secondaries` is empty.
    pub fn new(
        config: SyncerConfig,
        primary: Box<dyn BufferedSensorSource>,
        secondaries: Vec<Box<dyn BufferedSensorSource>>,
        listener: Box<dyn SyncListener>,
    ) -> Result<Self, ContractError> {
        if secondaries.is_empty() {
            return Err(ContractError::config_validation(
                "secondaries",
                "at least one secondary stream is required",
            ));
        }

        let strategy = strategy_for(config.pairing);
        let max_capacity = iter::once(&primary)
            .chain(secondaries.iter())
            .map(|s| s.capacity())
            .max()
            .unwrap_or(0);

        Ok(Self {
            config,
            primary: Stream::new(primary),
            secondaries: secondaries.into_iter().map(Stream::new).collect(),
            listener,
            strategy,
            running: false,
            start_timestamp: None,
            oldest_timestamp: None,
            most_recent_timestamp: None,
            last_primary: None,
            processed: 0,
            scratch: Vec::with_capacity(max_capacity),
        })
    }

    /// Replace the pairing strategy chosen by `config.pairing`
    pub fn with_strategy(mut self, strategy: Box<dyn PairingStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Start every source
    ///
    /// Uses [`contracts::monotonic_nanos`] when `timestamp` is `None`. Sources
    /// may ignore samples older than the start timestamp, so callers feeding
    /// timestamps from another clock origin should pass `Some(origin)`.
    /// Start is atomic: if any source refuses, the ones already started are
    /// stopped again before the error is returned.
    ///
    /// # Errors
    /// - `AlreadyRunning` when already started
    /// - `SourceStart` when a source refuses to start
    #[instrument(name = "syncer_start", skip(self))]
    pub fn start(&mut self, timestamp: Option<i64>) -> Result<(), ContractError> {
        if self.running {
            return Err(ContractError::AlreadyRunning);
        }

        self.reset_state();
        let start_timestamp = timestamp.unwrap_or_else(monotonic_nanos);

        let mut failed = None;
        for (index, stream) in self.streams_mut().enumerate() {
            if !stream.source.start(start_timestamp) {
                failed = Some((index, stream.source.sensor_type()));
                break;
            }
        }

        if let Some((index, sensor_type)) = failed {
            warn!(sensor_type = %sensor_type, "source failed to start, rolling back");
            for stream in self.streams_mut().take(index) {
                stream.source.stop();
            }
            return Err(ContractError::SourceStart { sensor_type });
        }

        self.start_timestamp = Some(start_timestamp);
        self.running = true;
        info!(
            start_timestamp,
            streams = self.secondaries.len() + 1,
            strategy = self.strategy.name(),
            "synchronizer started"
        );
        Ok(())
    }

    /// Stop every source and return all pooled records
    ///
    /// Resets the processed count and both primary timestamps.
    ///
    /// # Errors
    /// `NotRunning` when not started.
    #[instrument(name = "syncer_stop", skip(self))]
    pub fn stop(&mut self) -> Result<(), ContractError> {
        if !self.running {
            return Err(ContractError::NotRunning);
        }

        let processed = self.processed;
        self.halt();
        self.reset_state();
        info!(processed, "synchronizer stopped");
        Ok(())
    }

    /// Copy a drained primary batch into the primary queue
    #[instrument(
        name = "syncer_primary_batch",
        level = "trace",
        skip(self, batch),
        fields(len = batch.len())
    )]
    pub fn on_primary_batch(&mut self, batch: &[Measurement]) {
        if !self.running || batch.is_empty() {
            return;
        }

        let copy = self.primary.buffer.copy_batch(batch);
        note_copy(self.primary.buffer.sensor_type(), copy);
        if copy.copied == 0 {
            return;
        }

        self.most_recent_timestamp = self.primary.buffer.last_accepted();
        // Recycling may have dropped the old head
        if self.oldest_timestamp.is_none() || copy.recycled > 0 {
            self.oldest_timestamp = self.primary.buffer.front().map(|m| m.timestamp);
        }
    }

    /// Copy a drained secondary batch into its queue and merge
    ///
    /// Ignored until the primary stream has delivered at least one sample.
    ///
    /// # Errors
    /// `UnknownStream` when `index` names no secondary stream.
    #[instrument(
        name = "syncer_secondary_batch",
        level = "trace",
        skip(self, batch),
        fields(len = batch.len())
    )]
    pub fn on_secondary_batch(
        &mut self,
        index: usize,
        batch: &[Measurement],
    ) -> Result<(), ContractError> {
        let stream = self
            .secondaries
            .get_mut(index)
            .ok_or_else(|| unknown_stream(StreamId::Secondary(index)))?;

        if !self.running || self.most_recent_timestamp.is_none() {
            return Ok(());
        }

        let copy = stream.buffer.copy_batch(batch);
        note_copy(stream.buffer.sensor_type(), copy);

        if self.merge(index) == MergeOutcome::Halted {
            self.halt();
        }
        Ok(())
    }

    /// Record one hardware sample into a stream's source, then drain it
    ///
    /// # Errors
    /// `UnknownStream` when `stream` names no configured stream.
    pub fn on_hardware_sample(
        &mut self,
        stream: StreamId,
        measurement: &Measurement,
    ) -> Result<(), ContractError> {
        let outcome = self.stream_mut(stream)?.source.record(measurement);
        if !self.running {
            return Ok(());
        }

        if outcome == RecordOutcome::Filled {
            self.on_buffer_filled(stream)?;
            if !self.running {
                return Ok(());
            }
        }
        self.drain(stream)
    }

    /// Drain a stream's source and feed the batch through the merge
    ///
    /// The primary source and `DrainPolicy::All` secondaries drain by position.
    /// `DrainPolicy::UpToPrimary` secondaries drain by timestamp, bounded by
    /// the most recent primary timestamp.
    ///
    /// # Errors
    /// `UnknownStream` when `stream` names no configured stream.
    pub fn drain(&mut self, stream: StreamId) -> Result<(), ContractError> {
        if !self.running {
            // Still validate the stream id
            self.stream_ref(stream)?;
            return Ok(());
        }

        let mut batch = std::mem::take(&mut self.scratch);
        batch.clear();

        let drain_policy = self.config.secondary_drain;
        let most_recent = self.most_recent_timestamp;
        let result = {
            let source = &mut self.stream_mut(stream)?.source;
            match (stream, drain_policy, most_recent) {
                (StreamId::Secondary(_), DrainPolicy::UpToPrimary, Some(bound)) => {
                    source.measurements_before_timestamp(bound, &mut batch);
                }
                (StreamId::Secondary(_), DrainPolicy::UpToPrimary, None) => {}
                _ => {
                    let position = source.position();
                    source.measurements_before_position(position, &mut batch);
                }
            }

            match stream {
                StreamId::Primary => {
                    self.on_primary_batch(&batch);
                    Ok(())
                }
                StreamId::Secondary(index) => self.on_secondary_batch(index, &batch),
            }
        };

        self.scratch = batch;
        result
    }

    /// Forward a source accuracy change to the listener
    ///
    /// # Errors
    /// `UnknownStream` when `stream` names no configured stream.
    pub fn on_accuracy_changed(
        &mut self,
        stream: StreamId,
        accuracy: SensorAccuracy,
    ) -> Result<(), ContractError> {
        let sensor_type = self.stream_ref(stream)?.source.sensor_type();
        if accuracy == SensorAccuracy::Unreliable {
            warn!(sensor_type = %sensor_type, "sensor accuracy unreliable");
        } else {
            debug!(sensor_type = %sensor_type, accuracy = ?accuracy, "sensor accuracy changed");
        }

        let status = self.status();
        self.listener
            .on_accuracy_changed(&status, sensor_type, accuracy);
        Ok(())
    }

    /// Handle a source reporting that its ring buffer filled before a drain
    ///
    /// Stops the synchronizer when `stop_when_filled_buffer` is set; otherwise
    /// only the listener is notified.
    ///
    /// # Errors
    /// `UnknownStream` when `stream` names no configured stream.
    pub fn on_buffer_filled(&mut self, stream: StreamId) -> Result<(), ContractError> {
        let sensor_type = self.stream_ref(stream)?.source.sensor_type();
        warn!(sensor_type = %sensor_type, "source buffer filled before drain");
        metrics::counter!(
            "syncer_buffer_filled_total",
            "sensor_type" => sensor_type.as_str()
        )
        .increment(1);

        let status = self.status();
        self.listener.on_buffer_filled(&status, sensor_type);

        if self.config.stop_when_filled_buffer && self.running {
            self.halt();
        }
        Ok(())
    }

    /// Merge queued secondary samples of one stream against the primary queue
    #[instrument(name = "syncer_merge", level = "trace", skip(self))]
    fn merge(&mut self, index: usize) -> MergeOutcome {
        let Some(most_recent) = self.most_recent_timestamp else {
            return MergeOutcome::Idle;
        };

        let Self {
            config,
            primary,
            secondaries,
            listener,
            strategy,
            running,
            oldest_timestamp,
            last_primary,
            processed,
            ..
        } = self;
        let Some(secondary) = secondaries.get_mut(index) else {
            return MergeOutcome::Idle;
        };
        let sensor_type = secondary.buffer.sensor_type();

        while let Some(front) = secondary.buffer.front() {
            let timestamp = front.timestamp;
            if timestamp > most_recent {
                break;
            }

            if config.out_of_order_detection_enabled
                && oldest_timestamp.is_some_and(|oldest| timestamp < oldest)
            {
                warn!(
                    sensor_type = %sensor_type,
                    timestamp,
                    oldest = ?*oldest_timestamp,
                    "out-of-order measurement"
                );
                metrics::counter!(
                    "syncer_out_of_order_total",
                    "sensor_type" => sensor_type.as_str()
                )
                .increment(1);

                let status = SyncerStatus {
                    running: *running,
                    processed: *processed,
                    oldest_timestamp: *oldest_timestamp,
                    most_recent_timestamp: Some(most_recent),
                };
                listener.on_out_of_order_measurement(&status, sensor_type, front);

                if config.stop_when_out_of_order {
                    return MergeOutcome::Halted;
                }
            }

            if let Some(primary_index) = strategy.select(&primary.buffer, front) {
                if let Some(slot) = primary.buffer.take_at(primary_index) {
                    let consumed = primary.buffer.get(&slot);
                    match last_primary {
                        Some(record) => record.copy_from(consumed),
                        None => *last_primary = Some(consumed.clone()),
                    }
                    primary.buffer.release(slot);
                    *oldest_timestamp = primary.buffer.front().map(|m| m.timestamp);
                }
            }

            // Nothing pending and nothing consumed yet: wait for primary data
            let Some(paired) = last_primary.as_ref() else {
                break;
            };
            let Some(slot) = secondary.buffer.take_front() else {
                break;
            };

            *processed += 1;
            let synced = SyncedMeasurement {
                timestamp,
                sequence: *processed,
                primary: paired,
                secondary: secondary.buffer.get(&slot),
                secondary_index: index,
            };

            metrics::counter!(
                "syncer_measurements_synced_total",
                "sensor_type" => sensor_type.as_str()
            )
            .increment(1);
            metrics::histogram!("syncer_alignment_offset_ms")
                .record(synced.alignment_offset() as f64 / 1e6);

            let status = SyncerStatus {
                running: *running,
                processed: *processed,
                oldest_timestamp: *oldest_timestamp,
                most_recent_timestamp: Some(most_recent),
            };
            listener.on_synced_measurement(&status, &synced);

            secondary.buffer.release(slot);
        }

        MergeOutcome::Idle
    }

    /// Stop sources and reject further batches, keeping queued state
    fn halt(&mut self) {
        for stream in self.streams_mut() {
            stream.source.stop();
        }
        self.running = false;
        debug!(processed = self.processed, "synchronizer halted");
    }

    /// Return pooled records and clear counters and timestamps
    fn reset_state(&mut self) {
        for stream in self.streams_mut() {
            stream.buffer.clear();
        }
        self.start_timestamp = None;
        self.oldest_timestamp = None;
        self.most_recent_timestamp = None;
        self.last_primary = None;
        self.processed = 0;
    }

    fn streams_mut(&mut self) -> impl Iterator<Item = &mut Stream> {
        iter::once(&mut self.primary).chain(self.secondaries.iter_mut())
    }

    fn stream_ref(&self, stream: StreamId) -> Result<&Stream, ContractError> {
        match stream {
            StreamId::Primary => Ok(&self.primary),
            StreamId::Secondary(index) => self
                .secondaries
                .get(index)
                .ok_or_else(|| unknown_stream(stream)),
        }
    }

    fn stream_mut(&mut self, stream: StreamId) -> Result<&mut Stream, ContractError> {
        match stream {
            StreamId::Primary => Ok(&mut self.primary),
            StreamId::Secondary(index) => self
                .secondaries
                .get_mut(index)
                .ok_or_else(|| unknown_stream(stream)),
        }
    }

    /// Snapshot handed to listeners
    pub fn status(&self) -> SyncerStatus {
        SyncerStatus {
            running: self.running,
            processed: self.processed,
            oldest_timestamp: self.oldest_timestamp,
            most_recent_timestamp: self.most_recent_timestamp,
        }
    }

    /// Whether batches are accepted
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Timestamp recorded by the last successful start
    pub fn start_timestamp(&self) -> Option<i64> {
        self.start_timestamp
    }

    /// Timestamp of the oldest pending primary sample
    pub fn oldest_timestamp(&self) -> Option<i64> {
        self.oldest_timestamp
    }

    /// Timestamp of the newest primary sample seen
    pub fn most_recent_timestamp(&self) -> Option<i64> {
        self.most_recent_timestamp
    }

    /// Synced measurements emitted since start
    pub fn number_of_processed_measurements(&self) -> u64 {
        self.processed
    }

    /// Number of secondary streams
    pub fn secondary_count(&self) -> usize {
        self.secondaries.len()
    }

    /// Sensor kind of a stream
    ///
    /// # Errors
    /// `UnknownStream` when `stream` names no configured stream.
    pub fn sensor_type(&self, stream: StreamId) -> Result<SensorType, ContractError> {
        Ok(self.stream_ref(stream)?.source.sensor_type())
    }

    /// Pool/queue diagnostics for a stream
    ///
    /// # Errors
    /// `UnknownStream` when `stream` names no configured stream.
    pub fn buffer_stats(&self, stream: StreamId) -> Result<BufferStats, ContractError> {
        Ok(self.stream_ref(stream)?.buffer.stats())
    }

    /// Active configuration
    pub fn config(&self) -> &SyncerConfig {
        &self.config
    }
}

fn unknown_stream(stream: StreamId) -> ContractError {
    ContractError::UnknownStream {
        stream: stream.to_string(),
    }
}

fn note_copy(sensor_type: SensorType, copy: BatchCopy) {
    if copy.recycled > 0 {
        debug!(sensor_type = %sensor_type, recycled = copy.recycled, "pending measurements recycled");
        metrics::counter!(
            "syncer_pool_recycled_total",
            "sensor_type" => sensor_type.as_str()
        )
        .increment(copy.recycled as u64);
    }
    if copy.skipped > 0 {
        debug!(sensor_type = %sensor_type, skipped = copy.skipped, "stale measurements skipped");
        metrics::counter!(
            "syncer_stale_skipped_total",
            "sensor_type" => sensor_type.as_str()
        )
        .increment(copy.skipped as u64);
    }
}
