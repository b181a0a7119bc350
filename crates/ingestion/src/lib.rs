//! # Ingestion
//!
//! Sensor sample ingestion.
//!
//! Responsibilities:
//! - `RingBufferSource`: buffered sensor source backed by a ring buffer
//! - `MockSensorSource`: deterministic sample generator for tests
//! - `DispatchQueue`: funnels callbacks from any thread onto one consumer task
//! - Blueprint assembly: one `RingBufferSource` per configured stream
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{DispatchConfig, DispatchQueue, MockSensorSource, SourceEvent};
//!
//! let queue = DispatchQueue::spawn(synchronizer, DispatchConfig::default());
//! let accel = MockSensorSource::accelerometer(100.0, 0.02)
//!     .spawn(queue.handle(), StreamId::Primary, 500);
//!
//! accel.await?;
//! let synchronizer = queue.shutdown().await?;
//! ```

mod assembly;
mod config;
mod dispatch;
mod mock;
mod ring_source;

pub use assembly::{estimator_from_blueprint, synchronizer_from_blueprint};
pub use config::{DispatchConfig, IngestionMetrics, MetricsSnapshot};
pub use dispatch::{DispatchHandle, DispatchQueue, EventSink, SourceEvent};
pub use mock::{MockSensorConfig, MockSensorSource};
pub use ring_source::RingBufferSource;
