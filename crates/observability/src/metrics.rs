//! Synchronizer / statistics 指标收集模块
//!
//! 将同步事件与统计窗口结果导出为 Prometheus 指标，并在内存中聚合摘要。

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use contracts::{Measurement, SensorType, SyncedMeasurement, SyncerStatus};
use metrics::gauge;
use statistics::{RunningStats, StatisticsResult};
use sync_engine::SyncListener;

/// 记录最近一次同步输出的时间戳
///
/// 计数与对齐偏移直方图由 `Synchronizer` 自身以 `syncer_*` 指标记录，
/// 此处只补充其不导出的量。
///
/// # Example
///
/// ```ignore
/// fn on_synced_measurement(&mut self, status: &SyncerStatus, synced: &SyncedMeasurement<'_>) {
///     observability::record_synced_measurement(synced);
/// }
/// ```
pub fn record_synced_measurement(synced: &SyncedMeasurement<'_>) {
    gauge!(
        "syncer_last_synced_timestamp",
        "sensor_type" => synced.secondary.sensor_type.as_str()
    )
    .set(synced.timestamp as f64);
}

/// 记录统计窗口结果
///
/// 窗口完成计数由 `AccumulatedStatisticsEngine` 记录。
pub fn record_statistics_result(sensor_type: SensorType, result: &StatisticsResult) {
    let sensor_type = sensor_type.as_str();
    gauge!("statistics_average_norm", "sensor_type" => sensor_type).set(result.average_norm);
    gauge!("statistics_norm_std", "sensor_type" => sensor_type)
        .set(result.norm_standard_deviation);
    gauge!("statistics_root_psd", "sensor_type" => sensor_type).set(result.root_psd);
    gauge!("statistics_interval_ms", "sensor_type" => sensor_type)
        .set(result.average_time_interval * 1000.0);
}

/// 同步指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct SyncMetricsAggregator {
    /// 同步输出总数
    pub total_synced: u64,

    /// 乱序样本总数
    pub total_out_of_order: u64,

    /// 缓冲溢出次数
    pub total_buffer_filled: u64,

    /// 相邻同步输出的时间间隔 (ms)
    pub interval_stats: RunningStats,

    /// 各从属传感器对齐偏移 |primary - secondary| (ms)
    pub offset_stats: BTreeMap<SensorType, RunningStats>,

    /// 各传感器乱序次数
    pub out_of_order_counts: BTreeMap<SensorType, u64>,

    last_timestamp: Option<i64>,
}

impl SyncMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新同步输出统计
    pub fn update(&mut self, synced: &SyncedMeasurement<'_>) {
        self.total_synced += 1;

        if let Some(last) = self.last_timestamp {
            self.interval_stats
                .push((synced.timestamp - last) as f64 / 1e6);
        }
        self.last_timestamp = Some(synced.timestamp);

        self.offset_stats
            .entry(synced.secondary.sensor_type)
            .or_default()
            .push(synced.alignment_offset().abs() as f64 / 1e6);
    }

    /// 记录乱序样本
    pub fn record_out_of_order(&mut self, sensor_type: SensorType) {
        self.total_out_of_order += 1;
        *self.out_of_order_counts.entry(sensor_type).or_insert(0) += 1;
    }

    /// 记录缓冲溢出
    pub fn record_buffer_filled(&mut self) {
        self.total_buffer_filled += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let seen = self.total_synced + self.total_out_of_order;
        MetricsSummary {
            total_synced: self.total_synced,
            total_out_of_order: self.total_out_of_order,
            total_buffer_filled: self.total_buffer_filled,
            out_of_order_rate: if seen > 0 {
                self.total_out_of_order as f64 / seen as f64 * 100.0
            } else {
                0.0
            },
            sync_interval_ms: StatsSummary::from(&self.interval_stats),
            alignment_offset_ms: self
                .offset_stats
                .iter()
                .map(|(sensor_type, stats)| (sensor_type.as_str(), StatsSummary::from(stats)))
                .collect(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_synced: u64,
    pub total_out_of_order: u64,
    pub total_buffer_filled: u64,
    pub out_of_order_rate: f64,
    pub sync_interval_ms: StatsSummary,
    pub alignment_offset_ms: BTreeMap<&'static str, StatsSummary>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Sync Metrics Summary ===")?;
        writeln!(f, "Synced measurements: {}", self.total_synced)?;
        writeln!(
            f,
            "Out-of-order samples: {} ({:.2}%)",
            self.total_out_of_order, self.out_of_order_rate
        )?;
        writeln!(f, "Buffer filled events: {}", self.total_buffer_filled)?;
        writeln!(f, "Sync interval (ms): {}", self.sync_interval_ms)?;

        if !self.alignment_offset_ms.is_empty() {
            writeln!(f, "Alignment offset (ms):")?;
            for (sensor, stats) in &self.alignment_offset_ms {
                writeln!(f, "  {}: {}", sensor, stats)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 记录指标的同步监听器
///
/// 每个事件更新共享聚合器，再转发给内层监听器。Prometheus 计数已由
/// `Synchronizer` 记录，这里不重复计数。
pub struct MetricsListener<L> {
    inner: L,
    aggregator: Arc<Mutex<SyncMetricsAggregator>>,
}

impl<L: SyncListener> MetricsListener<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            aggregator: Arc::new(Mutex::new(SyncMetricsAggregator::new())),
        }
    }

    /// 共享聚合器句柄
    pub fn aggregator(&self) -> Arc<Mutex<SyncMetricsAggregator>> {
        self.aggregator.clone()
    }

    fn with_aggregator(&self, f: impl FnOnce(&mut SyncMetricsAggregator)) {
        // 聚合器仅用于摘要，锁中毒时跳过
        if let Ok(mut aggregator) = self.aggregator.lock() {
            f(&mut aggregator);
        }
    }
}

impl<L: SyncListener> SyncListener for MetricsListener<L> {
    fn on_accuracy_changed(
        &mut self,
        status: &SyncerStatus,
        sensor_type: SensorType,
        accuracy: contracts::SensorAccuracy,
    ) {
        self.inner.on_accuracy_changed(status, sensor_type, accuracy);
    }

    fn on_buffer_filled(&mut self, status: &SyncerStatus, sensor_type: SensorType) {
        self.with_aggregator(|a| a.record_buffer_filled());
        self.inner.on_buffer_filled(status, sensor_type);
    }

    fn on_out_of_order_measurement(
        &mut self,
        status: &SyncerStatus,
        sensor_type: SensorType,
        measurement: &Measurement,
    ) {
        self.with_aggregator(|a| a.record_out_of_order(sensor_type));
        self.inner
            .on_out_of_order_measurement(status, sensor_type, measurement);
    }

    fn on_synced_measurement(&mut self, status: &SyncerStatus, synced: &SyncedMeasurement<'_>) {
        record_synced_measurement(synced);
        self.with_aggregator(|a| a.update(synced));
        self.inner.on_synced_measurement(status, synced);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use sync_engine::NoopListener;

    const MS: i64 = 1_000_000;

    fn measurement(sensor_type: SensorType, timestamp: i64) -> Measurement {
        Measurement::new(sensor_type, Vector3::zeros(), timestamp)
    }

    fn synced<'a>(primary: &'a Measurement, secondary: &'a Measurement) -> SyncedMeasurement<'a> {
        SyncedMeasurement {
            timestamp: secondary.timestamp,
            sequence: 1,
            primary,
            secondary,
            secondary_index: 0,
        }
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = SyncMetricsAggregator::new();

        let p1 = measurement(SensorType::Gyroscope, 10 * MS);
        let s1 = measurement(SensorType::Accelerometer, 8 * MS);
        let p2 = measurement(SensorType::Gyroscope, 20 * MS);
        let s2 = measurement(SensorType::Accelerometer, 16 * MS);

        aggregator.update(&synced(&p1, &s1));
        aggregator.update(&synced(&p2, &s2));
        aggregator.record_out_of_order(SensorType::Accelerometer);

        assert_eq!(aggregator.total_synced, 2);
        assert_eq!(aggregator.total_out_of_order, 1);
        assert_eq!(aggregator.interval_stats.count(), 1);
        assert!((aggregator.interval_stats.mean() - 8.0).abs() < 1e-9);

        let offsets = &aggregator.offset_stats[&SensorType::Accelerometer];
        assert_eq!(offsets.count(), 2);
        assert!((offsets.mean() - 3.0).abs() < 1e-9);
        assert_eq!(
            aggregator.out_of_order_counts.get(&SensorType::Accelerometer),
            Some(&1)
        );
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = SyncMetricsAggregator::new();
        let p = measurement(SensorType::Gyroscope, 10 * MS);
        let s = measurement(SensorType::Magnetometer, 9 * MS);
        for _ in 0..3 {
            aggregator.update(&synced(&p, &s));
        }
        aggregator.record_out_of_order(SensorType::Magnetometer);

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Synced measurements: 3"));
        assert!(output.contains("25.00%"));
        assert!(output.contains("magnetometer: min=1.000"));
    }

    #[test]
    fn test_empty_summary() {
        let summary = SyncMetricsAggregator::new().summary();
        assert_eq!(summary.out_of_order_rate, 0.0);
        assert_eq!(format!("{}", summary.sync_interval_ms), "N/A");
    }

    #[test]
    fn test_metrics_listener_forwards_and_aggregates() {
        let mut listener = MetricsListener::new(NoopListener);
        let aggregator = listener.aggregator();
        let status = SyncerStatus::default();

        let p = measurement(SensorType::Gyroscope, 10 * MS);
        let s = measurement(SensorType::Accelerometer, 10 * MS);
        listener.on_synced_measurement(&status, &synced(&p, &s));
        listener.on_buffer_filled(&status, SensorType::Gyroscope);
        listener.on_out_of_order_measurement(&status, SensorType::Accelerometer, &s);

        let aggregator = aggregator.lock().unwrap();
        assert_eq!(aggregator.total_synced, 1);
        assert_eq!(aggregator.total_buffer_filled, 1);
        assert_eq!(aggregator.total_out_of_order, 1);
    }

    /// Recorder capturing registered metric names by kind
    #[derive(Default)]
    struct NameRecorder {
        registered: Mutex<Vec<(&'static str, String)>>,
    }

    impl NameRecorder {
        fn push(&self, kind: &'static str, key: &metrics::Key) {
            self.registered
                .lock()
                .unwrap()
                .push((kind, key.name().to_string()));
        }
    }

    impl metrics::Recorder for NameRecorder {
        fn describe_counter(
            &self,
            _: metrics::KeyName,
            _: Option<metrics::Unit>,
            _: metrics::SharedString,
        ) {
        }

        fn describe_gauge(
            &self,
            _: metrics::KeyName,
            _: Option<metrics::Unit>,
            _: metrics::SharedString,
        ) {
        }

        fn describe_histogram(
            &self,
            _: metrics::KeyName,
            _: Option<metrics::Unit>,
            _: metrics::SharedString,
        ) {
        }

        fn register_counter(
            &self,
            key: &metrics::Key,
            _: &metrics::Metadata<'_>,
        ) -> metrics::Counter {
            self.push("counter", key);
            metrics::Counter::noop()
        }

        fn register_gauge(
            &self,
            key: &metrics::Key,
            _: &metrics::Metadata<'_>,
        ) -> metrics::Gauge {
            self.push("gauge", key);
            metrics::Gauge::noop()
        }

        fn register_histogram(
            &self,
            key: &metrics::Key,
            _: &metrics::Metadata<'_>,
        ) -> metrics::Histogram {
            self.push("histogram", key);
            metrics::Histogram::noop()
        }
    }

    #[test]
    fn test_metrics_listener_leaves_counting_to_syncer() {
        let recorder = NameRecorder::default();
        let mut listener = MetricsListener::new(NoopListener);
        let status = SyncerStatus::default();
        let p = measurement(SensorType::Gyroscope, 10 * MS);
        let s = measurement(SensorType::Accelerometer, 9 * MS);

        metrics::with_local_recorder(&recorder, || {
            listener.on_synced_measurement(&status, &synced(&p, &s));
            listener.on_out_of_order_measurement(&status, SensorType::Accelerometer, &s);
            listener.on_buffer_filled(&status, SensorType::Gyroscope);
        });

        let registered = recorder.registered.lock().unwrap();
        assert_eq!(
            *registered,
            vec![("gauge", "syncer_last_synced_timestamp".to_string())]
        );
    }
}
