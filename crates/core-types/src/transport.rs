use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(String),
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Not connected")]
    NotConnected,
    /// The controller sent a byte outside 7-bit ASCII.
    #[error("Decode error: non-ASCII byte 0x{byte:02x} at offset {position}")]
    Decode { byte: u8, position: usize },
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e.to_string())
    }
}

/// Serial line parameters. The controller speaks 8N1 without flow control,
/// only the baud rate varies between boards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SerialConfig {
    pub device: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
    pub flow_control: FlowControl,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Hardware,
    Software,
}

impl SerialConfig {
    /// Standard 8N1 configuration for `device` at `baud_rate`.
    pub fn new_8n1(device: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            device: device.into(),
            baud_rate,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            flow_control: FlowControl::None,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new_8n1("", 115_200)
    }
}

/// A duplex async byte pipe to the controller.
///
/// Reads and writes take `&self` so the router task can sit in `read_chunk`
/// while other tasks write. Returned futures are `Send` so a generic router
/// can be spawned onto a multi-threaded runtime.
pub trait Transport: Send + Sync + 'static {
    /// Read the next chunk of bytes. An empty chunk is never returned;
    /// end-of-stream is reported as `TransportError::NotConnected`.
    fn read_chunk(&self) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;

    /// Write all of `data` and flush it to the device.
    fn write(&self, data: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Close the connection. Subsequent reads and writes fail with `NotConnected`.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_8n1() {
        let config = SerialConfig::new_8n1("/dev/ttyUSB0", 115200);
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.data_bits, 8);
        assert_eq!(config.stop_bits, 1);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.flow_control, FlowControl::None);
    }

    #[test]
    fn test_serial_config_partial_json() {
        let config: SerialConfig =
            serde_json::from_str(r#"{"device": "/dev/ttyACM0", "baud_rate": 9600}"#).unwrap();
        assert_eq!(config.device, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.data_bits, 8);
    }

    #[test]
    fn test_error_display() {
        let err = TransportError::Decode {
            byte: 0xff,
            position: 3,
        };
        assert_eq!(
            err.to_string(),
            "Decode error: non-ASCII byte 0xff at offset 3"
        );
    }
}
