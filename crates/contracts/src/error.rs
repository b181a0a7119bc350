//! Layered error definitions
//!
//! Categorized by source: config / state / source / dispatch

use thiserror::Error;

use crate::SensorType;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Invalid constructor argument
    #[error("invalid argument '{argument}': {message}")]
    InvalidArgument { argument: String, message: String },

    // ===== State Errors =====
    /// `start()` called while already running
    #[error("already running")]
    AlreadyRunning,

    /// `stop()` called while not running
    #[error("not running")]
    NotRunning,

    // ===== Source Errors =====
    /// Sensor source refused to start
    #[error("sensor source {sensor_type} failed to start")]
    SourceStart { sensor_type: SensorType },

    /// Stream index does not name a configured stream
    #[error("unknown stream: {stream}")]
    UnknownStream { stream: String },

    // ===== Dispatch Errors =====
    /// Dispatch queue receiver is gone
    #[error("dispatch queue closed")]
    DispatchClosed,

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid argument error
    pub fn invalid_argument(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a state error (start/stop misuse)
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::NotRunning)
    }
}
