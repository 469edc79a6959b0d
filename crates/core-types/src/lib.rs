//! # Core Types
//!
//! Types shared by every layer of the console:
//!
//! - **Line**: one terminator-stripped ASCII record received from the controller
//! - **LineKind**: shape-based classification of a line (`ok`, `error:<n>`, status, ...)
//! - **StatusReport / Mode**: parsed form of a `<...>` status report
//! - **Transport**: the async byte pipe the bridge reads from and writes to

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod status;
pub mod transport;

pub use status::{Mode, StatusReport};
pub use transport::{FlowControl, Parity, SerialConfig, Transport, TransportError};

/// Prefix of the firmware banner printed on boot and after a soft reset.
pub const BANNER_PREFIX: &str = "Grbl";

/// A single line received from the controller.
///
/// Lines are immutable once produced by the router. The terminator and any
/// trailing whitespace have been removed, and the content is guaranteed ASCII.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Line(String);

impl Line {
    /// Build a line from already-validated text.
    ///
    /// Trailing whitespace (including `\r`) is stripped so `Line::new("ok\r")`
    /// and `Line::new("ok")` compare equal.
    pub fn new(text: impl Into<String>) -> Self {
        let mut text = text.into();
        let trimmed = text.trim_end().len();
        text.truncate(trimmed);
        Self(text)
    }

    /// Decode a raw wire record. Any byte outside 7-bit ASCII is rejected.
    pub fn from_ascii(bytes: &[u8]) -> Result<Self, TransportError> {
        if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
            let byte = bytes.get(pos).copied().unwrap_or_default();
            return Err(TransportError::Decode { byte, position: pos });
        }
        // All bytes are ASCII, so this is valid UTF-8.
        let text = String::from_utf8_lossy(bytes).into_owned();
        Ok(Self::new(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Classify the line by its shape.
    pub fn kind(&self) -> LineKind {
        LineKind::classify(&self.0)
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Line {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Line {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Line {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<&str> for Line {
    fn from(s: &str) -> Self {
        Line::new(s)
    }
}

/// Shape of a controller line. Consumers use this for display and for
/// detecting acknowledgements; the router itself never classifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineKind {
    /// `ok`
    Ok,
    /// `error:<code>` (code kept as text, older firmware sends prose)
    Error(String),
    /// `ALARM:<code>`
    Alarm(String),
    /// `<...>` real-time status report
    Status,
    /// `[...]` bracketed feedback message, e.g. `[Enabled]`
    Message,
    /// Firmware banner, e.g. `Grbl 1.1f ['$' for help]`
    Banner,
    /// Anything else
    Text,
}

impl LineKind {
    pub fn classify(text: &str) -> Self {
        if text == "ok" {
            return LineKind::Ok;
        }
        if let Some(code) = text.strip_prefix("error:") {
            return LineKind::Error(code.trim().to_string());
        }
        if let Some(code) = text.strip_prefix("ALARM:") {
            return LineKind::Alarm(code.trim().to_string());
        }
        if text.starts_with('<') && text.ends_with('>') {
            return LineKind::Status;
        }
        if text.starts_with('[') && text.ends_with(']') {
            return LineKind::Message;
        }
        if text.starts_with(BANNER_PREFIX) {
            return LineKind::Banner;
        }
        LineKind::Text
    }
}
