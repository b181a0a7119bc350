//! # Statistics
//!
//! Accumulated noise statistics of a single sensor stream.
//!
//! - [`RunningStats`] / [`TriadStats`]: Welford mean and variance
//! - [`TimeIntervalEstimator`]: sampling interval statistics
//! - [`AccumulatedStatisticsEngine`]: windowed norm/axis statistics and PSD
//! - [`StatisticsEstimator`]: engine bound to a buffered sensor source

mod engine;
mod estimator;
mod interval;
mod running;

pub use contracts::{StatisticsConfig, StopMode};
pub use engine::{AccumulatedStatisticsEngine, StatisticsResult};
pub use estimator::{NoopStatisticsListener, StatisticsEstimator, StatisticsListener};
pub use interval::TimeIntervalEstimator;
pub use running::{RunningStats, TriadStats};
