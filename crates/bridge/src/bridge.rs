//! Connection lifecycle.
//!
//! [`Bridge`] owns the transport, the reply channel and the router task.
//! Everything that writes to the controller goes through the transaction
//! lock, so raw operator input can never interleave with a control
//! transaction.

use crate::config::BridgeConfig;
use crate::constants::wire;
use crate::errors::{BridgeError, Result};
use crate::mode::{ControlSession, ModeChange};
use crate::reply_channel::ReplyChannel;
use crate::router::ResponseRouter;
use core_types::{Line, StatusReport, Transport};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Turn one command line into wire bytes: trailing whitespace stripped,
/// newline appended. Non-ASCII text is rejected before anything is written.
pub fn encode_command(line: &str) -> Result<Vec<u8>> {
    let line = line.trim_end();
    if !line.is_ascii() {
        return Err(BridgeError::NonAscii(line.to_string()));
    }
    let mut data = Vec::with_capacity(line.len() + 1);
    data.extend_from_slice(line.as_bytes());
    data.push(wire::LINE_TERMINATOR);
    Ok(data)
}

pub struct Bridge<T: Transport> {
    transport: Arc<T>,
    replies: Arc<ReplyChannel>,
    router: Mutex<Option<JoinHandle<BridgeError>>>,
    config: BridgeConfig,
}

#[cfg(feature = "native")]
impl Bridge<transport_native::SerialTransport> {
    /// Open the configured serial device and start routing its output.
    pub fn connect(config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let transport = transport_native::SerialTransport::open(&config.serial)?;
        Ok(Self::new(transport, config))
    }
}

impl<T: Transport> Bridge<T> {
    /// Wrap an open transport and spawn the response router.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(transport: T, config: BridgeConfig) -> Self {
        let transport = Arc::new(transport);
        let replies = Arc::new(ReplyChannel::new());
        let router = ResponseRouter::new(transport.clone(), replies.clone()).spawn();
        info!(device = %config.serial.device, baud = config.serial.baud_rate, "bridge started");
        Self {
            transport,
            replies,
            router: Mutex::new(Some(router)),
            config,
        }
    }

    pub fn replies(&self) -> &Arc<ReplyChannel> {
        &self.replies
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Write the wake-up sequence and give the controller time to settle.
    ///
    /// Whatever it prints meanwhile goes to the default queue.
    pub async fn wakeup(&self) -> Result<()> {
        let _lock = self.replies.lock_transaction().await;
        debug!("sending wake-up sequence");
        self.transport.write(wire::WAKEUP_SEQUENCE).await?;
        tokio::time::sleep(self.config.wakeup_settle()).await;
        Ok(())
    }

    /// Take default-queue lines until one starts with the banner prefix.
    ///
    /// Lines before the banner are consumed (logged, not returned). Bound it
    /// with `tokio::time::timeout` when the controller may never answer.
    pub async fn wait_for_banner(&self) -> Result<Line> {
        loop {
            let line = self.next_line().await?;
            if line.as_str().starts_with(&self.config.banner_prefix) {
                info!(banner = %line, "controller detected");
                return Ok(line);
            }
            debug!(line = %line, "skipping pre-banner output");
        }
    }

    /// Send the soft-reset byte. The controller answers with its banner on
    /// the default queue.
    pub async fn reset(&self) -> Result<()> {
        let _lock = self.replies.lock_transaction().await;
        info!("soft reset");
        self.transport.write(&[wire::SOFT_RESET]).await?;
        Ok(())
    }

    /// Send one raw operator line. Replies appear on the default queue.
    pub async fn send(&self, line: &str) -> Result<()> {
        let data = encode_command(line)?;
        let _lock = self.replies.lock_transaction().await;
        debug!(data = ?String::from_utf8_lossy(&data), "serial write");
        self.transport.write(&data).await?;
        Ok(())
    }

    /// Open a control transaction. Waits for any running one to finish.
    pub async fn control(&self) -> ControlSession<'_, T> {
        ControlSession::new(self.replies.activate_control().await, &*self.transport)
    }

    pub async fn status(&self) -> Result<StatusReport> {
        self.control().await.status().await
    }

    pub async fn enable_check(&self) -> Result<ModeChange> {
        self.control().await.enable_check().await
    }

    pub async fn disable_check(&self) -> Result<ModeChange> {
        self.control().await.disable_check().await
    }

    /// Next line for the operator. Fails once the router has stopped and the
    /// default queue is drained.
    pub async fn next_line(&self) -> Result<Line> {
        match self.replies.pop_default().await {
            Some(line) => Ok(line),
            None => Err(self
                .replies
                .close_reason()
                .unwrap_or(BridgeError::ChannelClosed)),
        }
    }

    /// Stop the router, close the reply channel and the transport.
    pub async fn shutdown(&self) -> Result<()> {
        self.stop_router();
        self.replies.close(None);
        self.transport.close().await?;
        info!("bridge shut down");
        Ok(())
    }

    fn stop_router(&self) {
        let handle = self
            .router
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl<T: Transport> Drop for Bridge<T> {
    fn drop(&mut self) {
        if self.replies.is_closed() {
            return;
        }
        warn!("bridge dropped without shutdown");
        self.stop_router();
        self.replies.close(None);
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::reply_channel::QueueId;
    use std::time::Duration;
    use test_harness::{FakeGrbl, MockTransport, FAKE_BANNER};

    fn config() -> BridgeConfig {
        BridgeConfig::new("mock", 115_200)
    }

    #[test]
    fn test_encode_command() {
        assert_eq!(encode_command("G0 X10").unwrap(), b"G0 X10\n");
        assert_eq!(encode_command("G0 X10 \r\n").unwrap(), b"G0 X10\n");
        assert_eq!(encode_command("").unwrap(), b"\n");
        assert_eq!(
            encode_command("G0 X10 ; über").unwrap_err(),
            BridgeError::NonAscii("G0 X10 ; über".into())
        );
    }

    #[tokio::test]
    async fn test_send_routes_ack_to_default() {
        let (transport, handle) = MockTransport::with_responder(FakeGrbl::new());
        let bridge = Bridge::new(transport, config());

        bridge.send("G0 X10").await.unwrap();
        assert_eq!(handle.written_text(), "G0 X10\n");
        assert_eq!(bridge.next_line().await.unwrap(), "ok");
        assert_eq!(bridge.replies().active(), QueueId::Default);
    }

    #[tokio::test]
    async fn test_send_non_ascii_writes_nothing() {
        let (transport, handle) = MockTransport::new();
        let bridge = Bridge::new(transport, config());
        assert!(matches!(
            bridge.send("G0 X→").await,
            Err(BridgeError::NonAscii(_))
        ));
        assert!(handle.writes().is_empty());
    }

    #[tokio::test]
    async fn test_reset_prints_banner() {
        let (transport, handle) = MockTransport::with_responder(FakeGrbl::new());
        let bridge = Bridge::new(transport, config());

        bridge.reset().await.unwrap();
        assert_eq!(handle.writes(), vec![vec![0x18]]);
        assert_eq!(bridge.wait_for_banner().await.unwrap(), FAKE_BANNER);
    }

    #[tokio::test]
    async fn test_wait_for_banner_skips_noise() {
        let (transport, handle) = MockTransport::new();
        let bridge = Bridge::new(transport, config());

        handle.inject_lines(&["ok", "[MSG:'$H'|'$X' to unlock]", FAKE_BANNER, "ok"]);
        assert_eq!(bridge.wait_for_banner().await.unwrap(), FAKE_BANNER);
        assert_eq!(bridge.next_line().await.unwrap(), "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wakeup_writes_sequence_and_settles() {
        let (transport, handle) = MockTransport::new();
        let bridge = Bridge::new(transport, config());

        let started = tokio::time::Instant::now();
        bridge.wakeup().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(1000));
        assert_eq!(handle.written_text(), "\r\n\r\n");
    }

    #[tokio::test]
    async fn test_status_through_bridge() {
        let (transport, _handle) =
            MockTransport::with_responder(FakeGrbl::new().with_mode(core_types::Mode::Run));
        let bridge = Bridge::new(transport, config());
        let status = bridge.status().await.unwrap();
        assert_eq!(status.mode(), core_types::Mode::Run);
        assert_eq!(bridge.replies().default_len(), 0);
    }

    #[tokio::test]
    async fn test_hang_up_surfaces_fatal_error() {
        let (transport, handle) = MockTransport::new();
        let bridge = Bridge::new(transport, config());

        handle.hang_up();
        let err = bridge.next_line().await.unwrap_err();
        assert!(err.is_fatal());
        assert!(bridge.status().await.unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn test_shutdown_closes_everything() {
        let (transport, handle) = MockTransport::new();
        let bridge = Bridge::new(transport, config());

        bridge.shutdown().await.unwrap();
        assert!(handle.is_closed());
        assert!(bridge.replies().is_closed());
        assert_eq!(bridge.next_line().await.unwrap_err(), BridgeError::ChannelClosed);
        assert!(bridge.send("G0").await.is_err());
    }
}
