//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Measurement timestamps are monotonic nanoseconds (i64), as reported by the platform
//! - Interval statistics are expressed in seconds (f64)

mod blueprint;
mod clock;
mod error;
mod sensor;
mod sensor_source;
mod statistics_config;
mod sync;
mod sync_engine_config;

pub use blueprint::*;
pub use clock::{monotonic_nanos, NANOS_PER_MILLI, NANOS_PER_SECOND};
pub use error::*;
pub use sensor::*;
pub use sensor_source::{BufferedSensorSource, RecordOutcome};
pub use statistics_config::*;
pub use sync::*;
pub use sync_engine_config::*;
