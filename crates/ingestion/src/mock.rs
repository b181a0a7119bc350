//! Mock 传感器源
//!
//! 生成确定性的模拟测量（固定种子噪声），用于无真实硬件的测试。

use std::time::Duration;

use contracts::{
    monotonic_nanos, Measurement, SensorAccuracy, SensorType, StreamId, NANOS_PER_SECOND,
};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::dispatch::{DispatchHandle, SourceEvent};

/// Mock 传感器源配置
#[derive(Debug, Clone)]
pub struct MockSensorConfig {
    /// 传感器类型
    pub sensor_type: SensorType,

    /// 采样频率 (Hz)
    pub rate_hz: f64,

    /// 无噪声时的读数
    pub base: Vector3<f64>,

    /// 每轴均匀噪声幅值
    pub noise: f64,

    /// 第一帧时间戳 (ns)
    pub start_timestamp: i64,

    /// 随机种子
    pub seed: u64,
}

impl Default for MockSensorConfig {
    fn default() -> Self {
        Self {
            sensor_type: SensorType::Accelerometer,
            rate_hz: 50.0,
            base: Vector3::zeros(),
            noise: 0.0,
            start_timestamp: 0,
            seed: 7,
        }
    }
}

/// Mock 传感器源
///
/// 以固定周期生成测量，时间戳严格递增。实现 `Iterator`，也可通过
/// [`spawn`](Self::spawn) 以真实节奏推送到 [`DispatchHandle`]。
#[derive(Debug, Clone)]
pub struct MockSensorSource {
    config: MockSensorConfig,
    period_nanos: i64,
    frame: u64,
    rng: StdRng,
}

impl MockSensorSource {
    /// 创建新的 Mock 传感器源；非正频率按 1 Hz 处理
    pub fn new(config: MockSensorConfig) -> Self {
        let rate_hz = if config.rate_hz > 0.0 { config.rate_hz } else { 1.0 };
        let period_nanos = (NANOS_PER_SECOND as f64 / rate_hz).round() as i64;
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            period_nanos,
            frame: 0,
            rng,
        }
    }

    /// 静止加速度计：z 轴读数为重力
    pub fn accelerometer(rate_hz: f64, noise: f64) -> Self {
        Self::new(MockSensorConfig {
            sensor_type: SensorType::Accelerometer,
            rate_hz,
            base: Vector3::new(0.0, 0.0, 9.81),
            noise,
            ..Default::default()
        })
    }

    /// 静止陀螺仪
    pub fn gyroscope(rate_hz: f64, noise: f64) -> Self {
        Self::new(MockSensorConfig {
            sensor_type: SensorType::Gyroscope,
            rate_hz,
            noise,
            seed: 11,
            ..Default::default()
        })
    }

    /// 磁力计：固定地磁场 (µT)
    pub fn magnetometer(rate_hz: f64, noise: f64) -> Self {
        Self::new(MockSensorConfig {
            sensor_type: SensorType::Magnetometer,
            rate_hz,
            base: Vector3::new(22.0, 5.0, -40.0),
            noise,
            seed: 13,
            ..Default::default()
        })
    }

    /// 设置第一帧时间戳
    pub fn starting_at(mut self, start_timestamp: i64) -> Self {
        self.config.start_timestamp = start_timestamp;
        self
    }

    /// 第一帧使用当前单调时钟
    ///
    /// 与 `start(None)` 共用同一时钟原点；在其之后创建的 mock 不会被
    /// `RingBufferSource` 当作启动前的旧样本丢弃。
    pub fn starting_now(self) -> Self {
        self.starting_at(monotonic_nanos())
    }

    pub fn sensor_type(&self) -> SensorType {
        self.config.sensor_type
    }

    /// 采样周期 (ns)
    pub fn period_nanos(&self) -> i64 {
        self.period_nanos
    }

    /// 已生成帧数
    pub fn frames(&self) -> u64 {
        self.frame
    }

    /// 生成下一帧
    pub fn next_measurement(&mut self) -> Measurement {
        let timestamp = self.config.start_timestamp + self.frame as i64 * self.period_nanos;
        self.frame += 1;

        let values = if self.config.noise > 0.0 {
            let amplitude = self.config.noise;
            self.config.base
                + Vector3::from_fn(|_, _| self.rng.random_range(-amplitude..=amplitude))
        } else {
            self.config.base
        };

        Measurement::new(self.config.sensor_type, values, timestamp)
            .with_accuracy(SensorAccuracy::High)
    }

    /// 在后台任务中按采样周期推送 `count` 帧
    ///
    /// 通道关闭时提前结束，返回实际推送的帧数。
    pub fn spawn(
        mut self,
        handle: DispatchHandle,
        stream: StreamId,
        count: usize,
    ) -> JoinHandle<usize> {
        tokio::spawn(async move {
            let interval = Duration::from_nanos(self.period_nanos.max(0) as u64);
            debug!(
                sensor_type = %self.config.sensor_type,
                stream = %stream,
                rate_hz = self.config.rate_hz,
                "mock sensor source started"
            );

            let mut sent = 0;
            while sent < count {
                let measurement = self.next_measurement();
                let timestamp = measurement.timestamp;
                if handle
                    .send(SourceEvent::Sample { stream, measurement })
                    .await
                    .is_err()
                {
                    debug!(stream = %stream, "mock sensor channel closed");
                    break;
                }
                sent += 1;
                trace!(stream = %stream, timestamp, "mock sample sent");
                tokio::time::sleep(interval).await;
            }

            debug!(stream = %stream, sent, "mock sensor source stopped");
            sent
        })
    }
}

impl Iterator for MockSensorSource {
    type Item = Measurement;

    fn next(&mut self) -> Option<Measurement> {
        Some(self.next_measurement())
    }
}
