//! FusionBlueprint - Config Loader 输出
//!
//! 描述完整的采集配置：输入流、同步策略、统计窗口。

use serde::{Deserialize, Serialize};

use crate::{SensorType, StatisticsConfig, SyncerConfig};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的采集配置蓝图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 输入流列表，第一个为主时钟流
    pub streams: Vec<StreamConfig>,

    /// 同步策略配置
    #[serde(default)]
    pub syncer: SyncerConfig,

    /// 统计窗口配置
    #[serde(default)]
    pub statistics: StatisticsConfig,
}

impl FusionBlueprint {
    /// 主时钟流
    pub fn primary(&self) -> Option<&StreamConfig> {
        self.streams.first()
    }

    /// 从属流
    pub fn secondaries(&self) -> &[StreamConfig] {
        self.streams.get(1..).unwrap_or(&[])
    }
}

/// 输入流配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// 传感器类型
    pub sensor_type: SensorType,

    /// 源环形缓冲容量 (同时也是对象池容量)，必须 > 0
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// 期望采样率 (Hz)，必须 > 0
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,
}

fn default_capacity() -> usize {
    100
}

fn default_rate_hz() -> f64 {
    50.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_and_secondaries() {
        let blueprint = FusionBlueprint {
            version: ConfigVersion::V1,
            streams: vec![
                StreamConfig {
                    sensor_type: SensorType::Gyroscope,
                    capacity: 10,
                    rate_hz: 100.0,
                },
                StreamConfig {
                    sensor_type: SensorType::Accelerometer,
                    capacity: 10,
                    rate_hz: 50.0,
                },
            ],
            syncer: SyncerConfig::default(),
            statistics: StatisticsConfig::default(),
        };

        assert_eq!(
            blueprint.primary().map(|s| s.sensor_type),
            Some(SensorType::Gyroscope)
        );
        assert_eq!(blueprint.secondaries().len(), 1);
    }

    #[test]
    fn test_stream_defaults() {
        let stream: StreamConfig = serde_json::from_str(r#"{"sensor_type":"magnetometer"}"#).unwrap();
        assert_eq!(stream.capacity, 100);
        assert_eq!(stream.rate_hz, 50.0);
    }
}
