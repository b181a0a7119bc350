//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 e2e 测试（Mock 源 -> DispatchQueue -> Synchronizer / StatisticsEstimator）
//! - 配置加载到运行的完整链路

#[cfg(test)]
mod support {
    use std::sync::{Arc, Mutex, Once};

    use contracts::{Measurement, SensorType, StreamId, SyncedMeasurement, SyncerStatus};
    use ingestion::{MockSensorSource, SourceEvent};
    use statistics::{StatisticsListener, StatisticsResult};
    use sync_engine::SyncListener;

    /// 同步输出的拷贝
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct SyncedRecord {
        pub sequence: u64,
        pub timestamp: i64,
        pub primary_timestamp: i64,
        pub secondary_timestamp: i64,
        pub secondary_index: usize,
    }

    #[derive(Debug, Default)]
    pub struct Recorded {
        pub synced: Vec<SyncedRecord>,
        pub out_of_order: Vec<(SensorType, i64)>,
        pub buffer_filled: Vec<SensorType>,
    }

    /// 收集所有同步事件的监听器
    #[derive(Debug, Clone, Default)]
    pub struct CollectingListener {
        pub recorded: Arc<Mutex<Recorded>>,
    }

    impl SyncListener for CollectingListener {
        fn on_buffer_filled(&mut self, _status: &SyncerStatus, sensor_type: SensorType) {
            self.recorded.lock().unwrap().buffer_filled.push(sensor_type);
        }

        fn on_out_of_order_measurement(
            &mut self,
            _status: &SyncerStatus,
            sensor_type: SensorType,
            measurement: &Measurement,
        ) {
            self.recorded
                .lock()
                .unwrap()
                .out_of_order
                .push((sensor_type, measurement.timestamp));
        }

        fn on_synced_measurement(&mut self, _status: &SyncerStatus, synced: &SyncedMeasurement<'_>) {
            self.recorded.lock().unwrap().synced.push(SyncedRecord {
                sequence: synced.sequence,
                timestamp: synced.timestamp,
                primary_timestamp: synced.primary.timestamp,
                secondary_timestamp: synced.secondary.timestamp,
                secondary_index: synced.secondary_index,
            });
        }
    }

    /// 收集统计窗口结果的监听器
    #[derive(Debug, Clone, Default)]
    pub struct ResultCollector {
        pub results: Arc<Mutex<Vec<(SensorType, StatisticsResult)>>>,
        pub measurements: Arc<Mutex<usize>>,
    }

    impl StatisticsListener for ResultCollector {
        fn on_completed(&mut self, sensor_type: SensorType, result: &StatisticsResult) {
            observability::record_statistics_result(sensor_type, result);
            self.results.lock().unwrap().push((sensor_type, *result));
        }

        fn on_measurement(&mut self, _measurement: &Measurement) {
            *self.measurements.lock().unwrap() += 1;
        }
    }

    /// 安装一次紧凑格式日志 (不启动 Prometheus)
    pub fn init_tracing() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let config = observability::ObservabilityConfig {
                log_format: observability::LogFormat::Compact,
                metrics_port: None,
                ..Default::default()
            };
            // 其他测试二进制可能已安装 subscriber
            let _ = observability::init_with_config(config);
        });
    }

    /// 将多个 mock 源按时间戳交错成事件序列
    pub fn interleave(sources: Vec<(StreamId, MockSensorSource, usize)>) -> Vec<SourceEvent> {
        let mut events: Vec<SourceEvent> = sources
            .into_iter()
            .flat_map(|(stream, source, count)| {
                source
                    .take(count)
                    .map(move |measurement| SourceEvent::Sample {
                        stream,
                        measurement,
                    })
            })
            .collect();
        events.sort_by_key(|event| match event {
            SourceEvent::Sample { measurement, .. } => measurement.timestamp,
            _ => i64::MIN,
        });
        events
    }
}

#[cfg(test)]
mod contract_tests {
    use contracts::{FusionBlueprint, SensorType, StatisticsConfig, StopMode, SyncerConfig};

    #[test]
    fn test_contract_defaults() {
        let syncer = SyncerConfig::default();
        assert!(syncer.out_of_order_detection_enabled);
        assert!(!syncer.stop_when_out_of_order);
        assert!(syncer.stop_when_filled_buffer);

        let statistics = StatisticsConfig::default();
        assert_eq!(statistics.max_samples, 1000);
        assert_eq!(statistics.max_duration_millis, 1000);
        assert_eq!(statistics.stop_mode, StopMode::MaxSamplesOrDuration);
    }

    #[test]
    fn test_blueprint_json_shape() {
        let bp: FusionBlueprint = config_loader::ConfigLoader::load_from_str(
            r#"{"streams":[{"sensor_type":"gyroscope"},{"sensor_type":"accelerometer_uncalibrated"}]}"#,
            config_loader::ConfigFormat::Json,
        )
        .unwrap();
        assert_eq!(bp.secondaries()[0].sensor_type, SensorType::AccelerometerUncalibrated);
        assert!(bp.secondaries()[0].sensor_type.is_uncalibrated());
    }
}

#[cfg(test)]
mod e2e_tests {
    use contracts::{
        BufferedSensorSource, StatisticsConfig, StopMode, StreamId, SyncerConfig,
    };
    use ingestion::{
        DispatchConfig, DispatchQueue, MockSensorSource, RingBufferSource, SourceEvent,
    };
    use nalgebra::Vector3;
    use observability::MetricsListener;
    use statistics::StatisticsEstimator;
    use sync_engine::Synchronizer;

    use crate::support::{init_tracing, interleave, CollectingListener, ResultCollector};

    const MS: i64 = 1_000_000;

    fn ring(source: &MockSensorSource, capacity: usize) -> Box<dyn BufferedSensorSource> {
        Box::new(RingBufferSource::new(source.sensor_type(), capacity))
    }

    /// End-to-end test: MockSensorSource -> DispatchQueue -> Synchronizer
    ///
    /// 100 Hz 陀螺仪为主时钟，50 Hz 加速度计 (偏移 5 ms) 为从属流。
    /// 每个从属样本在下一个从属样本到达时完成配对，最后由显式 Drain 冲刷。
    #[tokio::test]
    async fn test_e2e_ordered_pipeline() {
        init_tracing();
        let gyro = MockSensorSource::gyroscope(100.0, 0.001);
        let accel = MockSensorSource::accelerometer(50.0, 0.01).starting_at(5 * MS);

        let listener = CollectingListener::default();
        let recorded = listener.recorded.clone();
        let mut syncer = Synchronizer::new(
            SyncerConfig::default(),
            ring(&gyro, 16),
            vec![ring(&accel, 16)],
            Box::new(listener),
        )
        .unwrap();
        syncer.start(Some(0)).unwrap();

        let queue = DispatchQueue::spawn(syncer, DispatchConfig::default());
        let handle = queue.handle();

        let events = interleave(vec![
            (StreamId::Primary, gyro, 40),
            (StreamId::Secondary(0), accel, 20),
        ]);
        for event in events {
            handle.send(event).await.unwrap();
        }
        handle
            .send(SourceEvent::Drain {
                stream: StreamId::Secondary(0),
            })
            .await
            .unwrap();

        let metrics = queue.metrics();
        let syncer = queue.shutdown().await.unwrap();
        assert!(syncer.is_running());
        assert_eq!(syncer.number_of_processed_measurements(), 20);
        assert_eq!(metrics.snapshot().events_rejected, 0);

        let recorded = recorded.lock().unwrap();
        assert!(recorded.out_of_order.is_empty());
        assert_eq!(recorded.synced.len(), 20);

        for (k, record) in recorded.synced.iter().enumerate() {
            assert_eq!(record.sequence, k as u64 + 1);
            assert_eq!(record.timestamp, record.secondary_timestamp);
            assert_eq!(record.secondary_timestamp, (20 * k as i64 + 5) * MS);
            assert_eq!(record.secondary_index, 0);
        }
        // 配对到合并时最新的主时钟样本
        for record in &recorded.synced[..19] {
            assert_eq!(record.primary_timestamp - record.secondary_timestamp, 15 * MS);
        }
        assert_eq!(recorded.synced[19].primary_timestamp, 390 * MS);
    }

    /// 乱序样本：继续输出 vs. 停止同步器
    #[tokio::test]
    async fn test_e2e_out_of_order_policies() {
        for stop_when_out_of_order in [false, true] {
            let listener = MetricsListener::new(CollectingListener::default());
            let aggregator = listener.aggregator();
            let config = SyncerConfig {
                stop_when_out_of_order,
                ..SyncerConfig::default()
            };
            let gyro = MockSensorSource::gyroscope(100.0, 0.0);
            let accel = MockSensorSource::accelerometer(100.0, 0.0);
            let mut syncer = Synchronizer::new(
                config,
                ring(&gyro, 8),
                vec![ring(&accel, 8)],
                Box::new(listener),
            )
            .unwrap();
            syncer.start(Some(0)).unwrap();

            let queue = DispatchQueue::spawn(syncer, DispatchConfig::new(16));
            let handle = queue.handle();

            let sample = |stream, sensor_type, t: i64| SourceEvent::Sample {
                stream,
                measurement: contracts::Measurement::new(sensor_type, Vector3::zeros(), t),
            };
            handle
                .send(sample(StreamId::Primary, gyro.sensor_type(), 100 * MS))
                .await
                .unwrap();
            handle
                .send(sample(StreamId::Primary, gyro.sensor_type(), 110 * MS))
                .await
                .unwrap();
            handle
                .send(sample(StreamId::Secondary(0), accel.sensor_type(), 50 * MS))
                .await
                .unwrap();
            handle
                .send(sample(StreamId::Primary, gyro.sensor_type(), 120 * MS))
                .await
                .unwrap();

            let syncer = queue.shutdown().await.unwrap();
            let aggregator = aggregator.lock().unwrap();
            assert_eq!(aggregator.total_out_of_order, 1);

            if stop_when_out_of_order {
                assert!(!syncer.is_running());
                assert_eq!(aggregator.total_synced, 0);
            } else {
                assert!(syncer.is_running());
                assert_eq!(aggregator.total_synced, 1);
                assert_eq!(syncer.most_recent_timestamp(), Some(120 * MS));
            }
        }
    }

    /// Mock 源以真实节奏并发推送
    #[tokio::test]
    async fn test_e2e_concurrent_mock_sources() {
        let gyro = MockSensorSource::gyroscope(500.0, 0.001);
        let accel = MockSensorSource::accelerometer(250.0, 0.01).starting_at(MS);

        let listener = CollectingListener::default();
        let recorded = listener.recorded.clone();
        let mut syncer = Synchronizer::new(
            SyncerConfig::default(),
            ring(&gyro, 64),
            vec![ring(&accel, 64)],
            Box::new(listener),
        )
        .unwrap();
        syncer.start(Some(0)).unwrap();

        let queue = DispatchQueue::spawn(syncer, DispatchConfig::default());
        let gyro_task = gyro.spawn(queue.handle(), StreamId::Primary, 60);
        let accel_task = accel.spawn(queue.handle(), StreamId::Secondary(0), 30);

        assert_eq!(gyro_task.await.unwrap(), 60);
        assert_eq!(accel_task.await.unwrap(), 30);

        queue
            .handle()
            .send(SourceEvent::Drain {
                stream: StreamId::Secondary(0),
            })
            .await
            .unwrap();
        let syncer = queue.shutdown().await.unwrap();

        let recorded = recorded.lock().unwrap();
        assert!(!recorded.synced.is_empty());
        assert!(recorded.synced.len() <= 30);
        assert_eq!(
            syncer.number_of_processed_measurements(),
            recorded.synced.len() as u64
        );
        for (k, record) in recorded.synced.iter().enumerate() {
            assert_eq!(record.sequence, k as u64 + 1);
        }
        assert!(recorded
            .synced
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp));
    }

    /// End-to-end test: MockSensorSource -> DispatchQueue -> StatisticsEstimator
    #[tokio::test]
    async fn test_e2e_statistics_window() {
        let accel = MockSensorSource::accelerometer(100.0, 0.01);
        let collector = ResultCollector::default();
        let results = collector.results.clone();
        let measurements = collector.measurements.clone();

        let config = StatisticsConfig {
            max_samples: 100,
            stop_mode: StopMode::MaxSamplesOnly,
            ..Default::default()
        };
        let mut estimator =
            StatisticsEstimator::new(config, ring(&accel, 32), Box::new(collector)).unwrap();
        estimator.start(Some(0)).unwrap();

        let queue = DispatchQueue::spawn(estimator, DispatchConfig::default());
        let handle = queue.handle();
        for measurement in accel.take(200) {
            handle
                .send(SourceEvent::Sample {
                    stream: StreamId::Primary,
                    measurement,
                })
                .await
                .unwrap();
        }
        let estimator = queue.shutdown().await.unwrap();

        assert!(!estimator.is_running());
        assert_eq!(*measurements.lock().unwrap(), 100);

        let results = results.lock().unwrap();
        assert_eq!(results.len(), 1);
        let (sensor_type, result) = results[0];
        assert_eq!(sensor_type, contracts::SensorType::Accelerometer);
        assert_eq!(result.samples, 100);
        assert_eq!(result.elapsed_time_nanos, 990 * MS);
        assert!((result.average_norm - 9.81).abs() < 0.01);
        assert!((result.average_time_interval - 0.01).abs() < 1e-9);
        assert!(result.time_interval_variance.abs() < 1e-12);
        assert!(result.norm_standard_deviation > 0.0);
        assert!((result.psd - result.norm_variance * 0.01).abs() < 1e-12);
    }

    /// start(None) 与 starting_now() 的 mock 共用单调时钟原点
    #[tokio::test]
    async fn test_e2e_clock_started_estimator_keeps_samples() {
        let collector = ResultCollector::default();
        let results = collector.results.clone();
        let config = StatisticsConfig {
            max_samples: 10,
            stop_mode: StopMode::MaxSamplesOnly,
            ..Default::default()
        };
        let source = RingBufferSource::new(contracts::SensorType::Gyroscope, 32);
        let mut estimator =
            StatisticsEstimator::new(config, Box::new(source), Box::new(collector)).unwrap();
        estimator.start(None).unwrap();

        let gyro = MockSensorSource::gyroscope(200.0, 0.0).starting_now();
        let queue = DispatchQueue::spawn(estimator, DispatchConfig::default());
        let sent = gyro.spawn(queue.handle(), StreamId::Primary, 10);
        assert_eq!(sent.await.unwrap(), 10);
        let estimator = queue.shutdown().await.unwrap();

        assert!(!estimator.is_running());
        let results = results.lock().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].1.samples, 10);
    }

    /// 发往估计器的从属流事件被拒绝
    #[tokio::test]
    async fn test_e2e_estimator_rejects_secondary_events() {
        let accel = MockSensorSource::accelerometer(100.0, 0.0);
        let mut estimator = StatisticsEstimator::new(
            StatisticsConfig::default(),
            ring(&accel, 8),
            Box::new(ResultCollector::default()),
        )
        .unwrap();
        estimator.start(Some(0)).unwrap();

        let queue = DispatchQueue::spawn(estimator, DispatchConfig::default());
        queue
            .handle()
            .send(SourceEvent::Drain {
                stream: StreamId::Secondary(0),
            })
            .await
            .unwrap();
        let metrics = queue.metrics();
        queue.shutdown().await.unwrap();
        assert_eq!(metrics.snapshot().events_rejected, 1);
    }
}

#[cfg(test)]
mod config_e2e_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{SensorType, StreamId};
    use ingestion::{
        estimator_from_blueprint, synchronizer_from_blueprint, DispatchConfig, DispatchQueue,
        MockSensorSource, SourceEvent,
    };
    use observability::MetricsListener;

    use crate::support::{interleave, CollectingListener, ResultCollector};

    const BLUEPRINT: &str = r#"
[[streams]]
sensor_type = "gyroscope"
capacity = 32
rate_hz = 100.0

[[streams]]
sensor_type = "accelerometer"
capacity = 32
rate_hz = 50.0

[[streams]]
sensor_type = "magnetometer"
capacity = 16
rate_hz = 25.0

[syncer]
pairing = "nearest"

[statistics]
max_duration_millis = 500
stop_mode = "max_duration_only"
"#;

    /// 配置文件 -> 同步器 -> 三路流同步
    #[tokio::test]
    async fn test_blueprint_driven_three_way_sync() {
        let blueprint = ConfigLoader::load_from_str(BLUEPRINT, ConfigFormat::Toml).unwrap();

        let listener = MetricsListener::new(CollectingListener::default());
        let aggregator = listener.aggregator();
        let mut syncer = synchronizer_from_blueprint(&blueprint, Box::new(listener)).unwrap();
        syncer.start(Some(0)).unwrap();
        assert_eq!(syncer.sensor_type(StreamId::Secondary(1)).unwrap(), SensorType::Magnetometer);

        let queue = DispatchQueue::spawn(syncer, DispatchConfig::default());
        let handle = queue.handle();
        let events = interleave(vec![
            (StreamId::Primary, MockSensorSource::gyroscope(100.0, 0.0), 50),
            (
                StreamId::Secondary(0),
                MockSensorSource::accelerometer(50.0, 0.0).starting_at(3_000_000),
                25,
            ),
            (
                StreamId::Secondary(1),
                MockSensorSource::magnetometer(25.0, 0.0).starting_at(7_000_000),
                12,
            ),
        ]);
        for event in events {
            handle.send(event).await.unwrap();
        }
        for index in 0..2 {
            handle
                .send(SourceEvent::Drain {
                    stream: StreamId::Secondary(index),
                })
                .await
                .unwrap();
        }
        let syncer = queue.shutdown().await.unwrap();

        let summary = aggregator.lock().unwrap().summary();
        assert_eq!(summary.total_synced, 37);
        assert_eq!(summary.total_synced, syncer.number_of_processed_measurements());
        assert!(summary.alignment_offset_ms.contains_key("accelerometer"));
        assert!(summary.alignment_offset_ms.contains_key("magnetometer"));
        assert!(format!("{summary}").contains("Synced measurements: 37"));
    }

    /// 配置文件 -> 统计估计器 (按时长结束)
    #[tokio::test]
    async fn test_blueprint_driven_statistics() {
        let blueprint = ConfigLoader::load_from_str(BLUEPRINT, ConfigFormat::Toml).unwrap();
        let collector = ResultCollector::default();
        let results = collector.results.clone();

        let mut estimator = estimator_from_blueprint(&blueprint, Box::new(collector)).unwrap();
        estimator.start(Some(0)).unwrap();

        let queue = DispatchQueue::spawn(estimator, DispatchConfig::default());
        let handle = queue.handle();
        for measurement in MockSensorSource::gyroscope(100.0, 0.002).take(100) {
            handle
                .send(SourceEvent::Sample {
                    stream: StreamId::Primary,
                    measurement,
                })
                .await
                .unwrap();
        }
        queue.shutdown().await.unwrap();

        let results = results.lock().unwrap();
        assert_eq!(results.len(), 1);
        // 0 ms .. 500 ms 共 51 个样本
        assert_eq!(results[0].1.samples, 51);
        assert_eq!(results[0].1.elapsed_time_nanos, 500_000_000);
    }
}
