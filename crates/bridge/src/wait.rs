//! Reply-sequence matching on the control queue.
//!
//! The control queue carries no correlation ids: a reply belongs to a
//! transaction purely by arrival order. A transaction therefore states the
//! exact lines it expects and fails on the first line that differs.

use crate::constants::wire;
use crate::errors::{BridgeError, Result};
use crate::reply_channel::ControlGuard;
use core_types::{Line, LineKind};
use tracing::{debug, warn};

/// Synchronous outcome of one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    Ok,
    /// `error:<code>`
    Error(String),
}

impl Ack {
    pub fn is_ok(&self) -> bool {
        matches!(self, Ack::Ok)
    }
}

/// A command line and everything the controller answered to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub command: String,
    pub ack: Ack,
    /// Lines that arrived before the acknowledgement (settings dumps,
    /// `[...]` feedback, status reports).
    pub feedback: Vec<Line>,
}

impl ControlGuard<'_> {
    /// Consume control lines, matching them one by one against `expected`.
    ///
    /// Succeeds once every token matched in order. The first line that does
    /// not equal the next token is consumed and reported as
    /// [`BridgeError::ProtocolMismatch`]; nothing after it is read. There is no
    /// timeout here: wrap the call in `tokio::time::timeout` if needed, the
    /// guard still restores the default queue when the future is dropped.
    pub async fn wait_for(&mut self, expected: &[&str]) -> Result<()> {
        debug!(?expected, "waiting for reply sequence");
        for token in expected {
            let line = self.pop().await?;
            if line.as_str() != *token {
                warn!(expected = %token, received = %line, "reply sequence mismatch");
                return Err(BridgeError::ProtocolMismatch {
                    expected: (*token).to_string(),
                    received: line.into_string(),
                });
            }
        }
        Ok(())
    }

    /// Consume control lines up to and including the next `ok` / `error:<n>`.
    pub async fn wait_for_ack(&mut self, command: &str) -> Result<CommandOutcome> {
        let mut feedback = Vec::new();
        loop {
            let line = self.pop().await?;
            let ack = match line.kind() {
                LineKind::Ok => Ack::Ok,
                LineKind::Error(code) => Ack::Error(code),
                _ => {
                    feedback.push(line);
                    continue;
                }
            };
            debug!(command, reply = %line, "command acknowledged");
            return Ok(CommandOutcome {
                command: command.to_string(),
                ack,
                feedback,
            });
        }
    }
}

impl std::fmt::Display for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ack::Ok => f.write_str(wire::ACK_OK),
            Ack::Error(code) => write!(f, "{}{}", wire::ACK_ERROR_PREFIX, code),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use crate::errors::BridgeError;
    use crate::reply_channel::ReplyChannel;
    use crate::wait::Ack;
    use core_types::Line;

    #[tokio::test]
    async fn test_wait_for_ok() {
        let channel = ReplyChannel::new();
        let mut guard = channel.activate_control().await;
        channel.push(Line::new("ok"));
        guard.wait_for(&["ok"]).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_error_consumes_only_mismatch() {
        let channel = ReplyChannel::new();
        let mut guard = channel.activate_control().await;
        channel.push(Line::new("error:1"));
        channel.push(Line::new("ok"));

        let err = guard.wait_for(&["ok"]).await.unwrap_err();
        assert_eq!(
            err,
            BridgeError::ProtocolMismatch {
                expected: "ok".into(),
                received: "error:1".into(),
            }
        );
        // The line after the mismatch is untouched.
        assert_eq!(channel.control_len(), 1);
        assert_eq!(guard.try_pop().unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_wait_for_sequence_in_order() {
        let channel = ReplyChannel::new();
        let mut guard = channel.activate_control().await;
        channel.push(Line::new("[Enabled]"));
        channel.push(Line::new("ok"));
        guard.wait_for(&["[Enabled]", "ok"]).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_sequence_out_of_order() {
        let channel = ReplyChannel::new();
        let mut guard = channel.activate_control().await;
        channel.push(Line::new("ok"));
        channel.push(Line::new("[Enabled]"));
        let err = guard.wait_for(&["[Enabled]", "ok"]).await.unwrap_err();
        assert!(matches!(err, BridgeError::ProtocolMismatch { .. }));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_empty_sequence_matches_immediately() {
        let channel = ReplyChannel::new();
        let mut guard = channel.activate_control().await;
        guard.wait_for(&[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_ack_collects_feedback() {
        let channel = ReplyChannel::new();
        let mut guard = channel.activate_control().await;
        for line in ["$0=10", "$1=25", "ok"] {
            channel.push(Line::new(line));
        }
        let outcome = guard.wait_for_ack("$$").await.unwrap();
        assert_eq!(outcome.ack, Ack::Ok);
        assert_eq!(outcome.feedback, vec![Line::new("$0=10"), Line::new("$1=25")]);
    }

    #[tokio::test]
    async fn test_wait_for_ack_error() {
        let channel = ReplyChannel::new();
        let mut guard = channel.activate_control().await;
        channel.push(Line::new("error:20"));
        let outcome = guard.wait_for_ack("G5").await.unwrap();
        assert_eq!(outcome.ack, Ack::Error("20".into()));
        assert_eq!(outcome.ack.to_string(), "error:20");
    }
}
