//! Single-consumer dispatch queue
//!
//! Hardware callbacks may arrive on any thread. Producers hold a cloneable
//! [`DispatchHandle`] and push [`SourceEvent`]s into a bounded
//! `async_channel`; one tokio task owns the consumer (a [`Synchronizer`] or a
//! [`StatisticsEstimator`]) and applies events in arrival order.

use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender, TrySendError};
use contracts::{ContractError, Measurement, SensorAccuracy, StreamId};
use statistics::StatisticsEstimator;
use sync_engine::Synchronizer;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::{DispatchConfig, IngestionMetrics};

/// Event delivered by a platform sensor callback
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// One hardware sample
    Sample {
        stream: StreamId,
        measurement: Measurement,
    },
    /// Accuracy change notification
    AccuracyChanged {
        stream: StreamId,
        accuracy: SensorAccuracy,
    },
    /// Explicit drain request
    Drain { stream: StreamId },
}

impl SourceEvent {
    /// Stream the event belongs to
    pub fn stream(&self) -> StreamId {
        match self {
            Self::Sample { stream, .. }
            | Self::AccuracyChanged { stream, .. }
            | Self::Drain { stream } => *stream,
        }
    }
}

/// Consumer side of the dispatch queue
pub trait EventSink: Send + 'static {
    /// Apply one event
    fn apply(&mut self, event: SourceEvent) -> Result<(), ContractError>;
}

impl EventSink for Synchronizer {
    fn apply(&mut self, event: SourceEvent) -> Result<(), ContractError> {
        match event {
            SourceEvent::Sample {
                stream,
                measurement,
            } => self.on_hardware_sample(stream, &measurement),
            SourceEvent::AccuracyChanged { stream, accuracy } => {
                self.on_accuracy_changed(stream, accuracy)
            }
            SourceEvent::Drain { stream } => self.drain(stream),
        }
    }
}

impl EventSink for StatisticsEstimator {
    fn apply(&mut self, event: SourceEvent) -> Result<(), ContractError> {
        if event.stream() != StreamId::Primary {
            return Err(ContractError::UnknownStream {
                stream: event.stream().to_string(),
            });
        }
        match event {
            SourceEvent::Sample { measurement, .. } => self.on_hardware_sample(&measurement),
            SourceEvent::AccuracyChanged { accuracy, .. } => self.on_accuracy_changed(accuracy),
            SourceEvent::Drain { .. } => {}
        }
        Ok(())
    }
}

/// Producer handle, cheap to clone
#[derive(Debug, Clone)]
pub struct DispatchHandle {
    tx: Sender<SourceEvent>,
    metrics: Arc<IngestionMetrics>,
}

impl DispatchHandle {
    /// Send, waiting for room when the queue is full
    ///
    /// # Errors
    /// `DispatchClosed` after the queue shut down
    pub async fn send(&self, event: SourceEvent) -> Result<(), ContractError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| ContractError::DispatchClosed)?;
        self.metrics.record_received();
        Ok(())
    }

    /// Blocking send for producers running outside the async runtime
    ///
    /// # Errors
    /// `DispatchClosed` after the queue shut down
    pub fn send_blocking(&self, event: SourceEvent) -> Result<(), ContractError> {
        self.tx
            .send_blocking(event)
            .map_err(|_| ContractError::DispatchClosed)?;
        self.metrics.record_received();
        Ok(())
    }

    /// Non-blocking send; a full queue drops the event
    ///
    /// Returns `Ok(false)` when the event was dropped.
    ///
    /// # Errors
    /// `DispatchClosed` after the queue shut down
    pub fn try_send(&self, event: SourceEvent) -> Result<bool, ContractError> {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.metrics.record_received();
                Ok(true)
            }
            Err(TrySendError::Full(event)) => {
                self.metrics.record_dropped();
                metrics::counter!("dispatch_events_dropped_total").increment(1);
                debug!(stream = %event.stream(), "dispatch queue full, event dropped");
                Ok(false)
            }
            Err(TrySendError::Closed(_)) => Err(ContractError::DispatchClosed),
        }
    }

    /// Events waiting in the queue
    pub fn queue_len(&self) -> usize {
        self.tx.len()
    }
}

/// Dispatch queue owning one consumer task
pub struct DispatchQueue<S: EventSink> {
    handle: DispatchHandle,
    task: JoinHandle<S>,
}

impl<S: EventSink> DispatchQueue<S> {
    /// Spawn the consumer task on the current tokio runtime
    #[instrument(name = "dispatch_spawn", skip(sink, config), fields(capacity = config.channel_capacity))]
    pub fn spawn(sink: S, config: DispatchConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity.max(1));
        let metrics = Arc::new(IngestionMetrics::new());
        let task = tokio::spawn(Self::run(sink, rx, metrics.clone()));
        info!(capacity = config.channel_capacity, "dispatch queue started");
        Self {
            handle: DispatchHandle { tx, metrics },
            task,
        }
    }

    async fn run(mut sink: S, rx: Receiver<SourceEvent>, metrics: Arc<IngestionMetrics>) -> S {
        while let Ok(event) = rx.recv().await {
            metrics.update_queue_len(rx.len());
            let stream = event.stream();
            match sink.apply(event) {
                Ok(()) => metrics.record_applied(),
                Err(e) => {
                    metrics.record_rejected();
                    warn!(stream = %stream, error = %e, "dispatch event rejected");
                }
            }
        }
        debug!("dispatch channel drained, consumer exiting");
        sink
    }

    /// Producer handle
    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    /// Shared counters
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.handle.metrics.clone()
    }

    /// Close the queue, apply remaining events and hand back the consumer
    ///
    /// Outstanding handles start failing with `DispatchClosed`.
    ///
    /// # Errors
    /// `Other` if the consumer task panicked
    pub async fn shutdown(self) -> Result<S, ContractError> {
        self.handle.tx.close();
        let sink = self
            .task
            .await
            .map_err(|e| ContractError::Other(format!("dispatch consumer failed: {e}")))?;
        let snapshot = self.handle.metrics.snapshot();
        info!(
            received = snapshot.events_received,
            applied = snapshot.events_applied,
            rejected = snapshot.events_rejected,
            dropped = snapshot.events_dropped,
            "dispatch queue shut down"
        );
        Ok(sink)
    }
}
