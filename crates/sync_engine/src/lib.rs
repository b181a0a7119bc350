//! # Sync Engine
//!
//! Multi-stream measurement synchronizer.
//!
//! 负责：
//! - 从缓冲传感器源批量 drain 测量
//! - 拷贝进对象池持有的流队列
//! - 以主时钟流为门限合并从属流
//! - 输出 `SyncedMeasurement`，处理乱序与缓冲溢出策略
//!
//! ## 使用示例
//!
//! ```ignore
//! use sync_engine::{Synchronizer, SyncerConfig, NoopListener};
//! use contracts::StreamId;
//!
//! let mut syncer = Synchronizer::new(
//!     SyncerConfig::default(),
//!     Box::new(gyroscope_source),
//!     vec![Box::new(accelerometer_source)],
//!     Box::new(NoopListener),
//! )?;
//!
//! syncer.start(None)?;
//! // Feed hardware callbacks as they arrive
//! syncer.on_hardware_sample(StreamId::Primary, &measurement)?;
//! ```

mod buffer;
mod engine;
mod listener;
mod pairing;
mod pool;

pub use buffer::{BatchCopy, StreamBuffer};
pub use engine::Synchronizer;
pub use listener::{NoopListener, SyncListener};
pub use pairing::{strategy_for, LatestPrimary, NearestPrimary, PairingStrategy};
pub use pool::{MeasurementPool, PoolSlot};

// Re-export contracts types
pub use contracts::{
    BufferStats, DrainPolicy, PairingPolicy, StreamId, SyncedMeasurement, SyncerConfig,
    SyncerStatus,
};
