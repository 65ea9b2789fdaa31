//! Configuration for the acquisition core
//!
//! All cadences that shape the data path are explicit parameters here
//! rather than hidden constants; in particular the consumer poll
//! interval, which also bounds recording fidelity (the recording buffer
//! is sampled on pull, see [`crate::store`]).
//!
//! Configuration is stored as TOML:
//!
//! ```toml
//! [serial]
//! baud_rate = 9600
//! read_timeout_ms = 100
//!
//! [sampling]
//! poll_interval_ms = 200
//! live_window = 1000
//!
//! [reporting]
//! interval_ms = 100
//!
//! [recording]
//! output_dir = "."
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DaqError, Result};
use crate::types::LIVE_WINDOW_CAP;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Serial link parameters
    pub serial: SerialConfig,
    /// Consumer-side sampling parameters
    pub sampling: SamplingConfig,
    /// Condition-reporter parameters
    pub reporting: ReportingConfig,
    /// Recording output parameters
    pub recording: RecordingConfig,
}

/// Serial link parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Line speed in baud
    pub baud_rate: u32,
    /// Read timeout; also bounds how quickly `close()` interrupts the
    /// reader thread
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            read_timeout_ms: 100,
        }
    }
}

impl SerialConfig {
    /// Read timeout as a [`Duration`]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Consumer-side sampling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Interval between consumer pulls; recording fidelity is bounded by
    /// this, not by the device message rate
    pub poll_interval_ms: u64,
    /// Live-window cap per channel
    pub live_window: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 200,
            live_window: LIVE_WINDOW_CAP,
        }
    }
}

impl SamplingConfig {
    /// Poll interval as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Condition-reporter parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Coarse polling interval of the condition reporter
    pub interval_ms: u64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self { interval_ms: 100 }
    }
}

impl ReportingConfig {
    /// Reporter interval as a [`Duration`]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Recording output parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Directory recorded CSV files are written into
    pub output_dir: PathBuf,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DaqError::Config(format!("read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| DaqError::Config(format!("parse {}: {e}", path.display())))
    }

    /// Load configuration, falling back to defaults when the file is
    /// missing or malformed
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("using default configuration: {e}");
                Self::default()
            }
        }
    }

    /// Save configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| DaqError::Config(format!("serialize config: {e}")))?;
        std::fs::write(path, content)
            .map_err(|e| DaqError::Config(format!("write {}: {e}", path.display())))
    }
}
