//! Accumulated statistics over one acquisition window.

use std::time::Duration;

use contracts::{
    ContractError, Measurement, StatisticsConfig, StopMode, NANOS_PER_SECOND,
};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::interval::TimeIntervalEstimator;
use crate::running::{RunningStats, TriadStats};

/// Mutable accumulation state, created on the first processed measurement
#[derive(Debug, Clone)]
struct AccumulatorState {
    count: u64,
    norm: RunningStats,
    triad: TriadStats,
    intervals: TimeIntervalEstimator,
    initial_timestamp: i64,
    end_timestamp: i64,
}

impl AccumulatorState {
    fn new(interval_cap: Option<u64>) -> Self {
        Self {
            count: 0,
            norm: RunningStats::default(),
            triad: TriadStats::default(),
            intervals: TimeIntervalEstimator::new(interval_cap),
            initial_timestamp: 0,
            end_timestamp: 0,
        }
    }

    fn reset(&mut self, interval_cap: Option<u64>) {
        self.count = 0;
        self.norm.reset();
        self.triad.reset();
        self.intervals.reset(interval_cap);
        self.initial_timestamp = 0;
        self.end_timestamp = 0;
    }

    fn elapsed_nanos(&self) -> i64 {
        self.end_timestamp - self.initial_timestamp
    }
}

/// Snapshot of a completed acquisition window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticsResult {
    /// Measurements in the window
    pub samples: u64,
    /// Mean of the measurement norm
    pub average_norm: f64,
    /// Variance of the measurement norm
    pub norm_variance: f64,
    /// Standard deviation of the measurement norm
    pub norm_standard_deviation: f64,
    /// Noise power spectral density (variance × mean interval)
    pub psd: f64,
    /// Square root of `psd`
    pub root_psd: f64,
    /// Per-axis mean
    pub average_triad: Vector3<f64>,
    /// Per-axis variance
    pub triad_variance: Vector3<f64>,
    /// Mean sampling interval (s)
    pub average_time_interval: f64,
    /// Sampling interval variance (s²)
    pub time_interval_variance: f64,
    /// Sampling interval standard deviation (s)
    pub time_interval_standard_deviation: f64,
    /// Window length in measurement time (ns)
    pub elapsed_time_nanos: i64,
}

/// Running noise statistics of a single sensor stream
///
/// Every measurement updates the mean/variance of its norm and of each axis
/// (Welford), and from the second measurement on the mean/variance of the
/// sampling interval. The window closes according to the configured
/// [`StopMode`]; derived results are available only after that.
///
/// ```
/// use contracts::{Measurement, SensorType, StatisticsConfig, StopMode};
/// use nalgebra::Vector3;
/// use statistics::AccumulatedStatisticsEngine;
///
/// let config = StatisticsConfig {
///     max_samples: 3,
///     stop_mode: StopMode::MaxSamplesOnly,
///     ..Default::default()
/// };
/// let mut engine = AccumulatedStatisticsEngine::new(config).unwrap();
///
/// let mut complete = false;
/// for i in 0..3 {
///     let m = Measurement::new(SensorType::Accelerometer, Vector3::new(0.0, 0.0, 9.81), i * 10_000_000);
///     complete = engine.process(&m);
/// }
/// assert!(complete);
/// assert!((engine.average_norm().unwrap() - 9.81).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct AccumulatedStatisticsEngine {
    config: StatisticsConfig,
    state: Option<AccumulatorState>,
    result_available: bool,
}

impl AccumulatedStatisticsEngine {
    /// Create an engine
    ///
    /// # Errors
    /// `InvalidArgument` when `max_samples` or `max_duration_millis` is negative.
    pub fn new(config: StatisticsConfig) -> Result<Self, ContractError> {
        config.check()?;
        Ok(Self {
            config,
            state: None,
            result_available: false,
        })
    }

    /// Replace the configuration and reset accumulated state
    ///
    /// # Errors
    /// `InvalidArgument` when a limit is negative; the engine is left unchanged.
    pub fn set_config(&mut self, config: StatisticsConfig) -> Result<(), ContractError> {
        config.check()?;
        self.config = config;
        self.reset();
        Ok(())
    }

    /// Feed one measurement
    ///
    /// Returns whether the window is complete. Once complete, further
    /// measurements are ignored until [`reset`](Self::reset).
    #[instrument(
        name = "statistics_process",
        level = "trace",
        skip(self, measurement),
        fields(timestamp = measurement.timestamp)
    )]
    pub fn process(&mut self, measurement: &Measurement) -> bool {
        if self.result_available {
            return true;
        }

        let cap = self.interval_cap();
        let state = self
            .state
            .get_or_insert_with(|| AccumulatorState::new(cap));

        if state.count == 0 {
            state.initial_timestamp = measurement.timestamp;
        } else {
            let delta_nanos = measurement.timestamp - state.end_timestamp;
            state
                .intervals
                .push(delta_nanos as f64 / NANOS_PER_SECOND as f64);
        }
        state.end_timestamp = measurement.timestamp;
        state.count += 1;

        state.norm.push(measurement.norm());
        state.triad.push(&measurement.values);

        let complete = self.is_window_complete();
        if complete {
            self.result_available = true;
            self.log_completion();
        }
        complete
    }

    /// Clear all counters and timestamps
    ///
    /// Re-seeds the interval cap from the current stop mode. Safe to call
    /// before the first `process()` and repeatedly.
    pub fn reset(&mut self) {
        let cap = self.interval_cap();
        if let Some(state) = self.state.as_mut() {
            state.reset(cap);
        }
        self.result_available = false;
        debug!(stop_mode = ?self.config.stop_mode, "statistics reset");
    }

    fn interval_cap(&self) -> Option<u64> {
        match self.config.stop_mode {
            StopMode::MaxSamplesOnly | StopMode::MaxSamplesOrDuration => {
                Some(u64::try_from(self.config.max_samples).unwrap_or(0))
            }
            StopMode::MaxDurationOnly => None,
        }
    }

    fn is_window_complete(&self) -> bool {
        let Some(state) = self.state.as_ref() else {
            return false;
        };

        let samples_reached = self.config.stop_mode.uses_samples()
            && i64::try_from(state.count).unwrap_or(i64::MAX) >= self.config.max_samples;
        let duration_reached = self.config.stop_mode.uses_duration()
            && state.elapsed_nanos() >= self.config.max_duration_nanos();

        samples_reached || duration_reached
    }

    fn log_completion(&self) {
        if let Some(result) = self.result() {
            info!(
                samples = result.samples,
                average_norm = result.average_norm,
                norm_std = result.norm_standard_deviation,
                root_psd = result.root_psd,
                elapsed_ms = result.elapsed_time_nanos as f64 / 1e6,
                "statistics window complete"
            );
            metrics::counter!("statistics_windows_completed_total").increment(1);
        }
    }

    /// Completed state, `None` while the window is still open
    fn completed(&self) -> Option<&AccumulatorState> {
        if self.result_available {
            self.state.as_ref()
        } else {
            None
        }
    }

    /// Snapshot of all derived results
    pub fn result(&self) -> Option<StatisticsResult> {
        let state = self.completed()?;
        let norm_variance = state.norm.variance();
        let psd = norm_variance * state.intervals.average();

        Some(StatisticsResult {
            samples: state.count,
            average_norm: state.norm.mean(),
            norm_variance,
            norm_standard_deviation: norm_variance.sqrt(),
            psd,
            root_psd: psd.sqrt(),
            average_triad: state.triad.mean(),
            triad_variance: state.triad.variance(),
            average_time_interval: state.intervals.average(),
            time_interval_variance: state.intervals.variance(),
            time_interval_standard_deviation: state.intervals.std_dev(),
            elapsed_time_nanos: state.elapsed_nanos(),
        })
    }

    /// Whether the window has closed
    pub fn is_result_available(&self) -> bool {
        self.result_available
    }

    /// Measurements processed since the last reset
    pub fn number_of_processed_measurements(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.count)
    }

    /// Timestamp of the first measurement in the window
    pub fn initial_timestamp(&self) -> Option<i64> {
        self.state
            .as_ref()
            .filter(|s| s.count > 0)
            .map(|s| s.initial_timestamp)
    }

    /// Timestamp of the latest measurement in the window
    pub fn end_timestamp(&self) -> Option<i64> {
        self.state
            .as_ref()
            .filter(|s| s.count > 0)
            .map(|s| s.end_timestamp)
    }

    /// Active configuration
    pub fn config(&self) -> &StatisticsConfig {
        &self.config
    }

    pub fn average_norm(&self) -> Option<f64> {
        self.completed().map(|s| s.norm.mean())
    }

    pub fn norm_variance(&self) -> Option<f64> {
        self.completed().map(|s| s.norm.variance())
    }

    pub fn norm_standard_deviation(&self) -> Option<f64> {
        self.norm_variance().map(f64::sqrt)
    }

    /// Noise PSD: norm variance × mean sampling interval
    pub fn psd(&self) -> Option<f64> {
        Some(self.norm_variance()? * self.average_time_interval()?)
    }

    pub fn root_psd(&self) -> Option<f64> {
        self.psd().map(f64::sqrt)
    }

    pub fn average_triad(&self) -> Option<Vector3<f64>> {
        self.completed().map(|s| s.triad.mean())
    }

    pub fn triad_variance(&self) -> Option<Vector3<f64>> {
        self.completed().map(|s| s.triad.variance())
    }

    pub fn triad_standard_deviation(&self) -> Option<Vector3<f64>> {
        self.completed().map(|s| s.triad.std_dev())
    }

    /// Per-axis PSD
    pub fn triad_psd(&self) -> Option<Vector3<f64>> {
        Some(self.triad_variance()? * self.average_time_interval()?)
    }

    pub fn triad_root_psd(&self) -> Option<Vector3<f64>> {
        self.triad_psd().map(|psd| psd.map(f64::sqrt))
    }

    /// Mean sampling interval (s)
    pub fn average_time_interval(&self) -> Option<f64> {
        self.completed().map(|s| s.intervals.average())
    }

    pub fn time_interval_variance(&self) -> Option<f64> {
        self.completed().map(|s| s.intervals.variance())
    }

    pub fn time_interval_standard_deviation(&self) -> Option<f64> {
        self.completed().map(|s| s.intervals.std_dev())
    }

    /// `end_timestamp - initial_timestamp` (ns)
    pub fn elapsed_time_nanos(&self) -> Option<i64> {
        self.completed().map(AccumulatorState::elapsed_nanos)
    }

    pub fn elapsed_time(&self) -> Option<Duration> {
        self.elapsed_time_nanos()
            .map(|nanos| Duration::from_nanos(u64::try_from(nanos).unwrap_or(0)))
    }
}
