//! Error types for the bridge.
//!
//! Errors fall into two groups, see [`BridgeError::is_fatal`]:
//!
//! - **fatal**: the serial link is unusable (open/read/write failure, non-ASCII
//!   input from the controller, router stopped). The session must end.
//! - **recoverable**: a transaction did not go as expected (reply mismatch,
//!   unexpected reply shape, bad command text). Report and carry on.

use core_types::TransportError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Serial transport failed (open, read, write, or decode)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The reader task has stopped, no more replies will arrive
    #[error("Reply channel closed: the serial reader has stopped")]
    ChannelClosed,

    /// A reply did not match the expected wait sequence
    #[error("Protocol mismatch: expected {expected:?}, received {received:?}")]
    ProtocolMismatch { expected: String, received: String },

    /// A reply had the wrong shape for the transaction
    #[error("Unexpected reply: {0:?}")]
    UnexpectedReply(String),

    /// Command text cannot be sent: the wire protocol is ASCII only
    #[error("Command contains non-ASCII characters: {0:?}")]
    NonAscii(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    /// True when the session cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::Transport(_) | BridgeError::ChannelClosed)
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BridgeError::ProtocolMismatch {
            expected: "[Enabled]".into(),
            received: "error:9".into(),
        };
        assert_eq!(
            err.to_string(),
            "Protocol mismatch: expected \"[Enabled]\", received \"error:9\""
        );
    }

    #[test]
    fn test_fatality() {
        assert!(BridgeError::from(TransportError::NotConnected).is_fatal());
        assert!(BridgeError::ChannelClosed.is_fatal());
        assert!(!BridgeError::UnexpectedReply("ok".into()).is_fatal());
        assert!(!BridgeError::NonAscii("G0 X1°".into()).is_fatal());
    }

    #[test]
    fn test_decode_error_is_fatal_transport_error() {
        let err: BridgeError = TransportError::Decode {
            byte: 0x80,
            position: 0,
        }
        .into();
        assert!(err.is_fatal());
        assert!(err.to_string().starts_with("Transport error: Decode error"));
    }
}
