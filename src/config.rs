use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SessionError, SessionResult};

/// Default ADC resolution in bits
pub const DEFAULT_RESOLUTION: u8 = 16;

/// Session construction parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Device address (MAC address, serial port path, ...). Discovery picks
    /// the first matching device when absent.
    pub address: Option<String>,

    /// Requested rate in Hz. The maximum allowed for the detected channel
    /// count is used when absent or out of range.
    pub rate: Option<u32>,

    /// Device kind matched during discovery
    pub device_kind: String,

    /// ADC resolution in bits (8 or 16)
    pub resolution: u8,

    /// How long teardown waits for the acquisition thread to exit
    pub grace_period_ms: u64,

    /// Tick of the periodic drain task
    pub drain_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            address: None,
            rate: None,
            device_kind: "biosignalsplux".to_string(),
            resolution: DEFAULT_RESOLUTION,
            grace_period_ms: 100,
            drain_interval_ms: 100,
        }
    }
}

impl SessionConfig {
    pub fn from_json(config: Value) -> SessionResult<Self> {
        serde_json::from_value(config)
            .map_err(|e| SessionError::InvalidConfiguration(e.to_string()))
    }

    /// Load a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            SessionError::InvalidConfiguration(format!(
                "failed to read session config from {:?}: {}",
                path, e
            ))
        })?;

        serde_json::from_str(&json)
            .map_err(|e| SessionError::InvalidConfiguration(format!("{:?}: {}", path, e)))
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_rate(mut self, rate: u32) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms.max(1))
    }

    /// Address to connect to, or `None` when discovery should pick one.
    /// Blank addresses are treated as absent.
    pub fn target_address(&self) -> Option<&str> {
        match self.address.as_deref().map(str::trim) {
            Some("") => {
                log::warn!("Invalid address {:?}, falling back to discovery", self.address);
                None
            }
            other => other,
        }
    }

    /// Resolution accepted by the device, falling back to the default
    pub fn effective_resolution(&self) -> u8 {
        match self.resolution {
            8 | 16 => self.resolution,
            other => {
                log::warn!(
                    "Unsupported resolution {} bits, using {}",
                    other,
                    DEFAULT_RESOLUTION
                );
                DEFAULT_RESOLUTION
            }
        }
    }
}
