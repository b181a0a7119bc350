//! 统计估计器 - 将 AccumulatedStatisticsEngine 绑定到单个数据源

use contracts::{
    monotonic_nanos, BufferedSensorSource, ContractError, Measurement, RecordOutcome,
    SensorAccuracy, SensorType, StatisticsConfig,
};
use tracing::{debug, info, instrument, warn};

use crate::engine::{AccumulatedStatisticsEngine, StatisticsResult};

/// Estimator callbacks
///
/// All methods default to no-ops.
pub trait StatisticsListener: Send {
    /// Window closed; the source has already been stopped
    fn on_completed(&mut self, _sensor_type: SensorType, _result: &StatisticsResult) {}

    /// Source ring buffer overwrote undrained samples
    fn on_buffer_filled(&mut self, _sensor_type: SensorType) {}

    /// Measurement accepted into the current window
    fn on_measurement(&mut self, _measurement: &Measurement) {}

    /// Platform reported an accuracy change
    fn on_accuracy_changed(&mut self, _sensor_type: SensorType, _accuracy: SensorAccuracy) {}
}

/// Listener that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStatisticsListener;

impl StatisticsListener for NoopStatisticsListener {}

/// 统计估计器
///
/// 硬件样本 → 数据源环形缓冲 → 按位置批量取出 → 引擎处理。
/// 窗口完成时仅停止数据源一次，并通知 `on_completed`。
pub struct StatisticsEstimator {
    source: Box<dyn BufferedSensorSource>,
    engine: AccumulatedStatisticsEngine,
    listener: Box<dyn StatisticsListener>,
    running: bool,
    scratch: Vec<Measurement>,
}

impl StatisticsEstimator {
    /// Create an estimator over `source`
    ///
    /// # Errors
    /// `InvalidArgument` when the configuration has negative limits.
    pub fn new(
        config: StatisticsConfig,
        source: Box<dyn BufferedSensorSource>,
        listener: Box<dyn StatisticsListener>,
    ) -> Result<Self, ContractError> {
        let engine = AccumulatedStatisticsEngine::new(config)?;
        let capacity = source.capacity();
        Ok(Self {
            source,
            engine,
            listener,
            running: false,
            scratch: Vec::with_capacity(capacity),
        })
    }

    /// Reset the engine and start the source
    ///
    /// `None` starts at [`contracts::monotonic_nanos`]. Sources may drop
    /// samples older than the start timestamp; pass `Some(origin)` when
    /// timestamps come from another clock.
    ///
    /// # Errors
    /// - `AlreadyRunning` if started
    /// - `SourceStart` if the source refuses to start
    #[instrument(name = "estimator_start", skip(self), fields(sensor = %self.source.sensor_type()))]
    pub fn start(&mut self, timestamp: Option<i64>) -> Result<(), ContractError> {
        if self.running {
            return Err(ContractError::AlreadyRunning);
        }

        self.engine.reset();
        let start_timestamp = timestamp.unwrap_or_else(monotonic_nanos);
        if !self.source.start(start_timestamp) {
            let sensor_type = self.source.sensor_type();
            warn!(sensor_type = %sensor_type, "source failed to start");
            return Err(ContractError::SourceStart { sensor_type });
        }

        self.running = true;
        info!(start_timestamp, "statistics estimator started");
        Ok(())
    }

    /// Stop the source, keeping accumulated results
    ///
    /// # Errors
    /// `NotRunning` if not started
    pub fn stop(&mut self) -> Result<(), ContractError> {
        if !self.running {
            return Err(ContractError::NotRunning);
        }
        self.source.stop();
        self.running = false;
        info!(
            processed = self.engine.number_of_processed_measurements(),
            "statistics estimator stopped"
        );
        Ok(())
    }

    /// Hardware callback entry point: record, drain, process
    ///
    /// Samples arriving while stopped are recorded by the source (which
    /// ignores them) and never reach the engine.
    pub fn on_hardware_sample(&mut self, measurement: &Measurement) {
        let outcome = self.source.record(measurement);
        if !self.running {
            return;
        }

        if outcome == RecordOutcome::Filled {
            let sensor_type = self.source.sensor_type();
            debug!(sensor_type = %sensor_type, "statistics source buffer filled");
            self.listener.on_buffer_filled(sensor_type);
        }

        self.scratch.clear();
        let position = self.source.position();
        self.source
            .measurements_before_position(position, &mut self.scratch);

        for m in &self.scratch {
            self.listener.on_measurement(m);
            if self.engine.process(m) {
                self.source.stop();
                self.running = false;
                if let Some(result) = self.engine.result() {
                    self.listener
                        .on_completed(self.source.sensor_type(), &result);
                }
                break;
            }
        }
    }

    /// Forward an accuracy change to the listener
    pub fn on_accuracy_changed(&mut self, accuracy: SensorAccuracy) {
        self.listener
            .on_accuracy_changed(self.source.sensor_type(), accuracy);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn sensor_type(&self) -> SensorType {
        self.source.sensor_type()
    }

    /// Underlying engine
    pub fn engine(&self) -> &AccumulatedStatisticsEngine {
        &self.engine
    }

    /// Result of the last completed window
    pub fn result(&self) -> Option<StatisticsResult> {
        self.engine.result()
    }
}
