use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bluetooth::{Address, SecurityLevel, ATT_DEFAULT_MTU, ATT_MAX_MTU};
use crate::config::ConfigError;

/// Harness configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Connection and pairing sequencing
    pub sequencer: SequencerConfig,

    /// Devices taking part in the run
    pub testbed: TestbedConfig,

    /// Logging and system settings
    pub system: SystemConfig,
}

/// Parameters of the connection/pairing sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// MTU requested after connecting
    pub mtu: u16,

    /// Level both sides must reach when securing the link
    pub security_level: SecurityLevel,

    /// Time allowed for a matching advertisement to show up
    #[serde(with = "duration_millis")]
    pub scan_timeout: Duration,

    /// Time allowed for the joint connect
    #[serde(with = "duration_millis")]
    pub connect_timeout: Duration,

    /// Time allowed for the joint secure/wait-security
    #[serde(with = "duration_millis")]
    pub security_timeout: Duration,

    /// Time allowed for any other single RPC
    #[serde(with = "duration_millis")]
    pub step_timeout: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            mtu: 512,
            security_level: SecurityLevel::LeLevel3,
            scan_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            security_timeout: Duration::from_secs(15),
            step_timeout: Duration::from_secs(5),
        }
    }
}

/// Kind of stack behind a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// A simulated reference stack that can host arbitrary profile services
    SimulatedStack,
    /// A platform stack acting as device under test
    Platform,
}

/// One device of the testbed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Human-readable label used in logs and reports
    pub label: String,

    pub kind: DeviceKind,

    /// Fixed address; generated from the device position when absent
    #[serde(default)]
    pub address: Option<Address>,

    /// Largest MTU the device accepts
    #[serde(default)]
    pub max_mtu: Option<u16>,

    /// Interval between scan passes, in milliseconds
    #[serde(default)]
    pub scan_interval_ms: Option<u64>,
}

impl DeviceConfig {
    pub fn new(label: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            label: label.into(),
            kind,
            address: None,
            max_mtu: None,
            scan_interval_ms: None,
        }
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }
}

/// Devices of the testbed; the first is the device under test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestbedConfig {
    pub devices: Vec<DeviceConfig>,
}

impl Default for TestbedConfig {
    fn default() -> Self {
        Self {
            devices: vec![
                DeviceConfig::new("dut", DeviceKind::Platform),
                DeviceConfig::new("ref", DeviceKind::SimulatedStack),
            ],
        }
    }
}

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(ConfigError::ValidationFailed(
                "system.log_level".to_string(),
                format!("unknown level '{}'", other),
            )),
        }
    }
}

/// Logging and system settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub log_level: LogLevel,

    /// Optional log file, appended to
    pub log_file: Option<PathBuf>,

    /// Debug categories: sequencer, verifier, runner, sim, or all
    pub debug_categories: Vec<String>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_file: None,
            debug_categories: Vec::new(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a file; a missing file yields the defaults
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(&default_config_path())
    }

    /// Save configuration as pretty JSON
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialization(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check values against their acceptable ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sequencer = &self.sequencer;
        if !(ATT_DEFAULT_MTU..=ATT_MAX_MTU).contains(&sequencer.mtu) {
            return Err(ConfigError::ValidationFailed(
                "sequencer.mtu".to_string(),
                format!("must be within {}..={}", ATT_DEFAULT_MTU, ATT_MAX_MTU),
            ));
        }

        let timeouts = [
            ("sequencer.scan_timeout", sequencer.scan_timeout),
            ("sequencer.connect_timeout", sequencer.connect_timeout),
            ("sequencer.security_timeout", sequencer.security_timeout),
            ("sequencer.step_timeout", sequencer.step_timeout),
        ];
        for (field, value) in timeouts {
            if value.is_zero() {
                return Err(ConfigError::ValidationFailed(
                    field.to_string(),
                    "must be greater than zero".to_string(),
                ));
            }
        }

        if self.testbed.devices.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "testbed.devices".to_string(),
                "at least one device is required".to_string(),
            ));
        }

        let mut labels = std::collections::HashSet::new();
        for device in &self.testbed.devices {
            if !labels.insert(device.label.as_str()) {
                return Err(ConfigError::ValidationFailed(
                    "testbed.devices".to_string(),
                    format!("duplicate label '{}'", device.label),
                ));
            }
            if let Some(mtu) = device.max_mtu {
                if !(ATT_DEFAULT_MTU..=ATT_MAX_MTU).contains(&mtu) {
                    return Err(ConfigError::ValidationFailed(
                        format!("testbed.devices.{}.max_mtu", device.label),
                        format!("must be within {}..={}", ATT_DEFAULT_MTU, ATT_MAX_MTU),
                    ));
                }
            }
        }

        for category in &self.system.debug_categories {
            if !crate::logging::DEBUG_CATEGORIES.contains(&category.as_str()) {
                return Err(ConfigError::ValidationFailed(
                    "system.debug_categories".to_string(),
                    format!("unknown category '{}'", category),
                ));
            }
        }

        Ok(())
    }
}

/// Get the default configuration path
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .map(|config_dir| config_dir.join("profile-harness").join("config.json"))
        .unwrap_or_else(|| PathBuf::from("profile-harness.json"))
}

// Durations travel as integer milliseconds
mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
