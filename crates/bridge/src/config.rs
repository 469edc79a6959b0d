use crate::constants::{serial, timing};
use crate::errors::{BridgeError, Result};
use core_types::{SerialConfig, BANNER_PREFIX};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Per-connection settings.
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```json
/// { "serial": { "device": "/dev/ttyACM0" }, "wakeup_settle_ms": 200 }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    pub serial: SerialConfig,
    /// Write the wake-up sequence after opening the port.
    pub send_wakeup: bool,
    /// Pause after the wake-up sequence (milliseconds).
    pub wakeup_settle_ms: u64,
    /// Lines starting with this prefix are treated as the firmware banner.
    pub banner_prefix: String,
    /// Startup wait for the banner (milliseconds).
    pub banner_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::new_8n1("", serial::DEFAULT_BAUD_RATE),
            send_wakeup: true,
            wakeup_settle_ms: timing::WAKEUP_SETTLE_MS,
            banner_prefix: BANNER_PREFIX.to_string(),
            banner_timeout_ms: timing::BANNER_TIMEOUT_MS,
        }
    }
}

impl BridgeConfig {
    pub fn new(device: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            serial: SerialConfig::new_8n1(device, baud_rate),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| BridgeError::Config(e.to_string()))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    pub fn wakeup_settle(&self) -> Duration {
        Duration::from_millis(self.wakeup_settle_ms)
    }

    pub fn banner_timeout(&self) -> Duration {
        Duration::from_millis(self.banner_timeout_ms)
    }

    /// Reject settings that cannot open a working connection.
    pub fn validate(&self) -> Result<()> {
        if self.serial.device.trim().is_empty() {
            return Err(BridgeError::Config(
                "No serial device given. Pass the device path, e.g. /dev/ttyUSB0.".into(),
            ));
        }
        if self.serial.baud_rate == 0 {
            return Err(BridgeError::Config("Baud rate must be greater than 0.".into()));
        }
        if self.banner_prefix.is_empty() {
            return Err(BridgeError::Config("Banner prefix must not be empty.".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.wakeup_settle(), Duration::from_secs(1));
        assert_eq!(config.banner_prefix, "Grbl");
        assert!(config.send_wakeup);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = BridgeConfig::from_json_str(
            r#"{"serial": {"device": "/dev/ttyACM0"}, "wakeup_settle_ms": 200}"#,
        )
        .unwrap();
        assert_eq!(config.serial.device, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.wakeup_settle_ms, 200);
        assert_eq!(config.banner_timeout_ms, 5000);
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let err = BridgeConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = BridgeConfig::from_json_file(Path::new("/nonexistent/grbl.json")).unwrap_err();
        match err {
            BridgeError::Config(msg) => assert!(msg.contains("/nonexistent/grbl.json")),
            other => panic!("Wrong error: {:?}", other),
        }
    }

    #[test]
    fn test_validate() {
        assert!(BridgeConfig::default().validate().is_err());
        assert!(BridgeConfig::new("/dev/ttyUSB0", 0).validate().is_err());
        assert!(BridgeConfig::new("/dev/ttyUSB0", 115_200).validate().is_ok());
    }
}
