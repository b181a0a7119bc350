//! Measurement - 传感器源输出
//!
//! 惯性/磁场传感器的单条测量记录。

use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// 传感器类型
///
/// 未校准 (uncalibrated) 类型额外携带三轴偏置读数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    Accelerometer,
    AccelerometerUncalibrated,
    Gyroscope,
    GyroscopeUncalibrated,
    Magnetometer,
    MagnetometerUncalibrated,
}

impl SensorType {
    /// 是否为未校准类型 (携带 bias)
    pub fn is_uncalibrated(self) -> bool {
        matches!(
            self,
            Self::AccelerometerUncalibrated
                | Self::GyroscopeUncalibrated
                | Self::MagnetometerUncalibrated
        )
    }

    /// 配置/日志中使用的名称
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accelerometer => "accelerometer",
            Self::AccelerometerUncalibrated => "accelerometer_uncalibrated",
            Self::Gyroscope => "gyroscope",
            Self::GyroscopeUncalibrated => "gyroscope_uncalibrated",
            Self::Magnetometer => "magnetometer",
            Self::MagnetometerUncalibrated => "magnetometer_uncalibrated",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 平台上报的精度等级
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorAccuracy {
    #[default]
    None,
    Low,
    Medium,
    High,
    /// 传感器需要重新校准
    Unreliable,
}

/// 传感器测量
///
/// 可变、可复用：同步引擎在 drain 时把数值拷贝进对象池持有的记录，
/// 源端后续覆写不会影响已同步的状态。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// 传感器类型
    pub sensor_type: SensorType,

    /// 三轴读数
    pub values: Vector3<f64>,

    /// 三轴偏置 (仅未校准类型)
    pub bias: Option<Vector3<f64>>,

    /// 单调时钟时间戳 (ns)
    pub timestamp: i64,

    /// 精度
    pub accuracy: SensorAccuracy,
}

impl Measurement {
    /// 创建测量
    pub fn new(sensor_type: SensorType, values: Vector3<f64>, timestamp: i64) -> Self {
        Self {
            sensor_type,
            values,
            bias: None,
            timestamp,
            accuracy: SensorAccuracy::default(),
        }
    }

    /// 对象池预分配使用的空记录
    pub fn empty(sensor_type: SensorType) -> Self {
        Self::new(sensor_type, Vector3::zeros(), 0)
    }

    /// 附加偏置读数
    pub fn with_bias(mut self, bias: Vector3<f64>) -> Self {
        self.bias = Some(bias);
        self
    }

    /// 设置精度
    pub fn with_accuracy(mut self, accuracy: SensorAccuracy) -> Self {
        self.accuracy = accuracy;
        self
    }

    /// 原地覆写 (不分配)
    #[inline]
    pub fn copy_from(&mut self, other: &Measurement) {
        self.sensor_type = other.sensor_type;
        self.values = other.values;
        self.bias = other.bias;
        self.timestamp = other.timestamp;
        self.accuracy = other.accuracy;
    }

    /// 扣除偏置后的读数
    #[inline]
    pub fn corrected(&self) -> Vector3<f64> {
        match self.bias {
            Some(bias) => self.values - bias,
            None => self.values,
        }
    }

    /// 三轴读数的模
    #[inline]
    pub fn norm(&self) -> f64 {
        self.values.norm()
    }
}
