//! Configuration for the acquisition loop
//!
//! The whole configuration surface consumed by the core lives in [`AppConfig`]:
//! sample and log intervals, the calibration constants, the trigger band, the
//! paired-device link parameters, and the log destination. Configuration is
//! loaded from a TOML file and validated once at startup; validation failures
//! are fatal ([`PressureLinkError::Config`]), everything downstream may assume
//! a well-formed config.
//!
//! # Example
//!
//! ```ignore
//! use pressurelink_rs::config::AppConfig;
//!
//! let config = AppConfig::load_or_default("pressurelink.toml");
//! config.validate()?;
//! ```

use crate::acquisition::converter::Calibration;
use crate::error::{PressureLinkError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config filename looked up next to the binary
pub const DEFAULT_CONFIG_FILE: &str = "pressurelink.toml";

/// Default minimum duration between samples in milliseconds
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 10;

/// Default minimum duration between persisted log records in seconds
pub const DEFAULT_LOG_INTERVAL_SECS: f64 = 0.25;

/// Full application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Acquisition loop timing
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// ADC bus topology
    #[serde(default)]
    pub adc: AdcConfig,

    /// Analog-to-physical conversion constants
    #[serde(default)]
    pub calibration: Calibration,

    /// Simulation trigger band
    #[serde(default)]
    pub trigger: TriggerConfig,

    /// Paired-device link parameters
    #[serde(default)]
    pub link: LinkConfig,

    /// Pressure log destination and throttling
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PressureLinkError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            PressureLinkError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load configuration, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path.as_ref()).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PressureLinkError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| PressureLinkError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            PressureLinkError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Validate the configuration; errors here are fatal at startup
    pub fn validate(&self) -> Result<()> {
        if self.acquisition.sample_interval_ms == 0 {
            return Err(PressureLinkError::Config(
                "sample_interval_ms must be positive".to_string(),
            ));
        }
        if !self.logging.log_interval_secs.is_finite() || self.logging.log_interval_secs < 0.0 {
            return Err(PressureLinkError::Config(
                "log_interval_secs must be finite and non-negative".to_string(),
            ));
        }
        if self.logging.filename.is_empty() {
            return Err(PressureLinkError::Config(
                "logging filename must not be empty".to_string(),
            ));
        }
        if self.trigger.band_low_mmhg > self.trigger.band_high_mmhg {
            return Err(PressureLinkError::Config(format!(
                "trigger band is inverted: [{}, {}]",
                self.trigger.band_low_mmhg, self.trigger.band_high_mmhg
            )));
        }
        if self.link.baud_rate == 0 {
            return Err(PressureLinkError::Config(
                "link baud_rate must be positive".to_string(),
            ));
        }
        self.calibration.validate()
    }
}

/// Acquisition loop timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Minimum duration between successive sample cycles in milliseconds
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
}

fn default_sample_interval_ms() -> u64 {
    DEFAULT_SAMPLE_INTERVAL_MS
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
        }
    }
}

impl AcquisitionConfig {
    /// Sample interval as a Duration
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

/// ADC bus topology (where the converter sits, not how codes are interpreted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdcConfig {
    /// I2C bus device node
    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: String,

    /// I2C address of the converter
    #[serde(default = "default_i2c_address")]
    pub i2c_address: u8,

    /// Single-ended input channel the transducer is wired to
    #[serde(default)]
    pub channel: u8,

    /// Programmable gain setting (Adafruit-compatible codes: 0 = 2/3x,
    /// 1 = +/-4.096 V, then 2, 4, 8, 16)
    #[serde(default = "default_adc_gain")]
    pub gain: u8,
}

fn default_i2c_bus() -> String {
    "/dev/i2c-1".to_string()
}

fn default_i2c_address() -> u8 {
    0x48
}

fn default_adc_gain() -> u8 {
    1
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            i2c_bus: default_i2c_bus(),
            i2c_address: default_i2c_address(),
            channel: 0,
            gain: default_adc_gain(),
        }
    }
}

/// Simulation trigger band in mmHg (inclusive on both ends)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Lower edge of the simulation band
    #[serde(default = "default_band_low")]
    pub band_low_mmhg: f64,

    /// Upper edge of the simulation band
    #[serde(default = "default_band_high")]
    pub band_high_mmhg: f64,
}

fn default_band_low() -> f64 {
    55.0
}

fn default_band_high() -> f64 {
    105.0
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            band_low_mmhg: default_band_low(),
            band_high_mmhg: default_band_high(),
        }
    }
}

/// Paired-device link parameters
///
/// The pairing layer (an external collaborator) binds the device's wireless
/// address to a local RFCOMM device node; the link transport opens that node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Address of the stethoscope to drive; when set, acquisition starts
    /// against it immediately instead of waiting for an operator selection
    #[serde(
        default = "default_device_address",
        skip_serializing_if = "Option::is_none"
    )]
    pub device_address: Option<String>,

    /// Device node the paired device is bound to
    #[serde(default = "default_link_port")]
    pub port: String,

    /// Serial baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Per-operation I/O timeout in milliseconds
    #[serde(default = "default_link_timeout_ms")]
    pub timeout_ms: u64,

    /// Settle delay after opening the link before the first exchange,
    /// in milliseconds (the device needs a beat after connecting)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Grace period between the stop-recording command and closing the link
    /// at shutdown, in milliseconds
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_device_address() -> Option<String> {
    Some("00:06:66:D0:E4:94".to_string())
}

fn default_link_port() -> String {
    "/dev/rfcomm0".to_string()
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_link_timeout_ms() -> u64 {
    1_000
}

fn default_settle_ms() -> u64 {
    2_000
}

fn default_shutdown_grace_ms() -> u64 {
    2_000
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device_address: default_device_address(),
            port: default_link_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_link_timeout_ms(),
            settle_ms: default_settle_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl LinkConfig {
    /// Per-operation I/O timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Post-open settle delay as a Duration
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Shutdown grace period as a Duration
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Pressure log destination and throttling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory the log session is created in (created if missing)
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,

    /// Log filename inside the directory
    #[serde(default = "default_log_filename")]
    pub filename: String,

    /// Minimum duration between persisted records in seconds; sampling may
    /// run much faster than this
    #[serde(default = "default_log_interval_secs")]
    pub log_interval_secs: f64,

    /// Scenario number written into the log header
    #[serde(default = "default_scenario")]
    pub scenario: u32,

    /// Device name written into the log header
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("dataOutput")
}

fn default_log_filename() -> String {
    "output.txt".to_string()
}

fn default_log_interval_secs() -> f64 {
    DEFAULT_LOG_INTERVAL_SECS
}

fn default_scenario() -> u32 {
    1
}

fn default_device_name() -> String {
    "ABPC".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            filename: default_log_filename(),
            log_interval_secs: default_log_interval_secs(),
            scenario: default_scenario(),
            device_name: default_device_name(),
        }
    }
}

impl LoggingConfig {
    /// Session name announced to the remote device (the filename stem)
    pub fn session_name(&self) -> String {
        Path::new(&self.filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.filename.clone())
    }

    /// Full path of the log file
    pub fn log_path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}
