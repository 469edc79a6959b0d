use crate::bridge::encode_command;
use crate::constants::wire;
use crate::errors::{BridgeError, Result};
use crate::reply_channel::ControlGuard;
use crate::wait::CommandOutcome;
use core_types::{LineKind, StatusReport, Transport};
use tracing::{debug, info};

/// Result of a check-mode transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    /// The controller was switched.
    Toggled,
    /// The controller was already in the requested state; nothing was sent.
    Unchanged,
}

/// An open control transaction: the control queue is active and this session
/// is the only writer on the serial line until it is dropped.
pub struct ControlSession<'a, T> {
    guard: ControlGuard<'a>,
    transport: &'a T,
}

impl<'a, T: Transport> ControlSession<'a, T> {
    pub(crate) fn new(guard: ControlGuard<'a>, transport: &'a T) -> Self {
        Self { guard, transport }
    }

    /// Write one command line (newline appended). Replies land on the
    /// control queue.
    pub async fn write_line(&mut self, command: &str) -> Result<()> {
        let data = encode_command(command)?;
        debug!(data = ?String::from_utf8_lossy(&data), "serial write");
        self.transport.write(&data).await?;
        Ok(())
    }

    /// Write a command and collect its replies up to the acknowledgement.
    pub async fn command(&mut self, command: &str) -> Result<CommandOutcome> {
        self.write_line(command).await?;
        self.guard.wait_for_ack(command.trim_end()).await
    }

    /// Poll the controller's status.
    ///
    /// Sends the real-time query, takes the next line as the report and then
    /// consumes the `ok` that answers the query's line terminator, so nothing
    /// of this exchange is left behind when it returns.
    pub async fn status(&mut self) -> Result<StatusReport> {
        self.write_line(wire::STATUS_QUERY).await?;
        let report = self.guard.pop().await?;
        self.guard.wait_for(&[wire::ACK_OK]).await?;

        if report.kind() != LineKind::Status {
            return Err(BridgeError::UnexpectedReply(report.into_string()));
        }
        let status = StatusReport::parse(report.as_str());
        debug!(fields = ?status.fields, "status report");
        Ok(status)
    }

    /// Put the controller into check mode unless it already is.
    pub async fn enable_check(&mut self) -> Result<ModeChange> {
        if self.status().await?.mode().is_check() {
            debug!("check mode already enabled");
            return Ok(ModeChange::Unchanged);
        }
        self.write_line(wire::CHECK_TOGGLE).await?;
        self.guard
            .wait_for(&[wire::CHECK_ENABLED, wire::ACK_OK])
            .await?;
        info!("check mode enabled");
        Ok(ModeChange::Toggled)
    }

    /// Leave check mode if the controller is in it.
    pub async fn disable_check(&mut self) -> Result<ModeChange> {
        if !self.status().await?.mode().is_check() {
            debug!("check mode already disabled");
            return Ok(ModeChange::Unchanged);
        }
        self.write_line(wire::CHECK_TOGGLE).await?;
        self.guard
            .wait_for(&[wire::CHECK_DISABLED, wire::ACK_OK])
            .await?;
        info!("check mode disabled");
        Ok(ModeChange::Toggled)
    }
}
