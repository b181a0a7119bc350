//! 在线统计计算器 (Welford's algorithm)

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Running mean/variance of a scalar
///
/// Variance is the population form `M2 / n`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    #[inline]
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 清零
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差 (M2 / n)
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    /// 无偏样本方差 (M2 / (n - 1))
    pub fn sample_variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Per-axis running statistics of a triad
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TriadStats {
    x: RunningStats,
    y: RunningStats,
    z: RunningStats,
}

impl TriadStats {
    /// 添加三轴读数
    #[inline]
    pub fn push(&mut self, values: &Vector3<f64>) {
        self.x.push(values.x);
        self.y.push(values.y);
        self.z.push(values.z);
    }

    /// 清零
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 三轴均值
    pub fn mean(&self) -> Vector3<f64> {
        Vector3::new(self.x.mean(), self.y.mean(), self.z.mean())
    }

    /// 三轴方差
    pub fn variance(&self) -> Vector3<f64> {
        Vector3::new(self.x.variance(), self.y.variance(), self.z.variance())
    }

    /// 三轴标准差
    pub fn std_dev(&self) -> Vector3<f64> {
        self.variance().map(f64::sqrt)
    }
}
