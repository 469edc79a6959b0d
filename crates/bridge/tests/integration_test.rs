//! End-to-end tests: bridge + router + fake controller over a mock transport.

#![allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]

use bridge::{Bridge, BridgeConfig, BridgeError, Mode, ModeChange, QueueId};
use std::time::Duration;
use test_harness::{FakeGrbl, MockTransport, FAKE_BANNER};

fn config() -> BridgeConfig {
    BridgeConfig {
        wakeup_settle_ms: 10,
        ..BridgeConfig::new("mock", 115_200)
    }
}

#[tokio::test]
async fn test_startup_then_raw_command() {
    let (transport, handle) = MockTransport::with_responder(FakeGrbl::new());
    let bridge = Bridge::new(transport, config());

    bridge.wakeup().await.unwrap();
    bridge.reset().await.unwrap();
    let banner = tokio::time::timeout(Duration::from_secs(1), bridge.wait_for_banner())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(banner, FAKE_BANNER);

    // The wake-up lines were acknowledged; drain those acks.
    while bridge.replies().try_pop_default().is_some() {}

    bridge.send("G0 X10").await.unwrap();
    assert_eq!(bridge.next_line().await.unwrap(), "ok");
    assert!(handle.written_text().ends_with("G0 X10\n"));

    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_status_on_legacy_report() {
    let (transport, handle) = MockTransport::new();
    let bridge = Bridge::new(transport, config());

    let responder = handle.clone();
    let status = tokio::spawn(async move {
        assert_eq!(responder.next_write().await.unwrap(), b"?\n");
        responder.inject_lines(&["<Check,MPos:0,0,0>", "ok"]);
    });

    let report = bridge.status().await.unwrap();
    status.await.unwrap();
    assert_eq!(report.fields, vec!["Check", "MPos:0,0,0"]);
    assert_eq!(report.mode(), Mode::Check);
    assert_eq!(bridge.replies().default_len(), 0);
}

#[tokio::test]
async fn test_status_on_pipe_report() {
    let (transport, handle) = MockTransport::new();
    let bridge = Bridge::new(transport, config());

    let responder = handle.clone();
    tokio::spawn(async move {
        responder.next_write().await.unwrap();
        responder.inject(b"<Idle|MPos:0.000,0.000,0.000|FS:0,0>\r\nok\r\n");
    });

    let report = bridge.status().await.unwrap();
    assert_eq!(report.mode(), Mode::Idle);
    assert_eq!(report.field("FS"), Some("0,0"));
}

#[tokio::test]
async fn test_enable_check_scenarios() {
    let (transport, handle) = MockTransport::with_responder(FakeGrbl::new());
    let bridge = Bridge::new(transport, config());

    assert_eq!(bridge.enable_check().await.unwrap(), ModeChange::Toggled);
    assert_eq!(bridge.enable_check().await.unwrap(), ModeChange::Unchanged);
    assert_eq!(handle.written_text().matches("$C").count(), 1);

    assert_eq!(bridge.disable_check().await.unwrap(), ModeChange::Toggled);
    assert_eq!(bridge.status().await.unwrap().mode(), Mode::Idle);
    assert_eq!(bridge.replies().default_len(), 0);
}

#[tokio::test]
async fn test_enable_check_rejected() {
    let (transport, _handle) = MockTransport::with_responder(
        FakeGrbl::new().with_check_toggle_reply(&["[Enabled]", "error:9"]),
    );
    let bridge = Bridge::new(transport, config());

    let err = bridge.enable_check().await.unwrap_err();
    assert_eq!(
        err,
        BridgeError::ProtocolMismatch {
            expected: "ok".into(),
            received: "error:9".into(),
        }
    );
    assert!(!err.is_fatal());
    assert_eq!(bridge.replies().active(), QueueId::Default);
}

#[tokio::test]
async fn test_timed_out_transaction_restores_default() {
    let (transport, handle) = MockTransport::new();
    let bridge = Bridge::new(transport, config());

    // Nobody answers: the status poll times out.
    let result = tokio::time::timeout(Duration::from_millis(50), bridge.status()).await;
    assert!(result.is_err());
    assert_eq!(bridge.replies().active(), QueueId::Default);

    // A late answer reaches the operator instead of a stale control queue.
    handle.inject_lines(&["<Idle,MPos:0,0,0>", "ok"]);
    assert_eq!(bridge.next_line().await.unwrap(), "<Idle,MPos:0,0,0>");
    assert_eq!(bridge.next_line().await.unwrap(), "ok");

    // And the transaction lock was released.
    bridge.send("G4 P0").await.unwrap();
}

#[tokio::test]
async fn test_send_waits_for_running_transaction() {
    let (transport, handle) = MockTransport::new();
    let bridge = Bridge::new(transport, config());

    let mut session = bridge.control().await;
    let send = bridge.send("G0 X1");
    tokio::pin!(send);
    assert!(
        tokio::time::timeout(Duration::from_millis(20), send.as_mut())
            .await
            .is_err(),
        "raw write went through during a control transaction"
    );

    session.write_line("$C").await.unwrap();
    drop(session);
    send.await.unwrap();
    assert_eq!(handle.written_text(), "$C\nG0 X1\n");
}

#[tokio::test]
async fn test_device_loss_is_fatal() {
    let (transport, handle) = MockTransport::with_responder(FakeGrbl::new());
    let bridge = Bridge::new(transport, config());

    bridge.send("G0 X1").await.unwrap();
    handle.hang_up();

    assert_eq!(bridge.next_line().await.unwrap(), "ok");
    let err = bridge.next_line().await.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(bridge.replies().close_reason(), Some(err));
}
