//! Settings management

mod harness_config;

use thiserror::Error;

pub use harness_config::{
    default_config_path, DeviceConfig, DeviceKind, HarnessConfig, LogLevel, SequencerConfig,
    SystemConfig, TestbedConfig,
};

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid JSON for the configuration schema
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A field holds an unacceptable value
    #[error("Invalid value for {0}: {1}")]
    ValidationFailed(String, String),
}
