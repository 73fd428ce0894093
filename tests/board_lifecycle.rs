//! End-to-end board lifecycle against a fake board.

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use common::{FakeBoard, sample_config};
use serde_json::json;
use tokio_test::assert_ok;
use yarrboard_bridge::bus::{MemorySink, SinkEvent};
use yarrboard_bridge::{
    BoardConfig, BoardConnection, BoardHandle, BoardManager, BridgeConfig, ChannelId,
    CommandState, ConnectionState,
};

// ============================================================================
// Helpers
// ============================================================================

const PREFIX: &str = "electrical.yarrboard";
const WAIT: Duration = Duration::from_secs(5);

fn spawn(config: BoardConfig) -> Result<(BoardHandle, Arc<MemorySink>)> {
    let sink = Arc::new(MemorySink::new());
    let handle = BoardConnection::spawn(config, PREFIX, sink.clone())?;
    Ok((handle, sink))
}

async fn wait_for_metadata(sink: &MemorySink, path: &str) -> bool {
    sink.wait_for(WAIT, |events| {
        events.iter().any(|e| match e {
            SinkEvent::Metadata { metadata, .. } => metadata.iter().any(|m| m.path == path),
            _ => false,
        })
    })
    .await
}

async fn wait_for_update(sink: &MemorySink, path: &str) -> bool {
    sink.wait_for(WAIT, |events| {
        events.iter().any(|e| match e {
            SinkEvent::Updates { updates, .. } => updates.iter().any(|u| u.path == path),
            _ => false,
        })
    })
    .await
}

async fn wait_for_state(handle: &BoardHandle, state: ConnectionState) -> bool {
    let mut status = handle.subscribe();
    tokio::time::timeout(WAIT, status.wait_for(|s| s.state == state))
        .await
        .is_ok_and(|seen| seen.is_ok())
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_config_requested_and_translated() -> Result<()> {
    let board = FakeBoard::start(sample_config()).await;
    let (handle, sink) = spawn(BoardConfig::new(board.host()))?;

    assert!(wait_for_metadata(&sink, "electrical.yarrboard.fake.pwm.0.softFuse").await);
    assert_eq!(handle.root_path().as_deref(), Some("electrical.yarrboard.fake"));
    assert_eq!(handle.state(), ConnectionState::Open);
    assert_eq!(handle.status().retries, 0);

    let updates = sink.updates();
    assert!(updates.iter().any(|u| u.path == "electrical.yarrboard.fake.board.name"));
    assert!(!updates.iter().any(|u| u.path.contains(".pwm.1.")));

    // Updates and metadata arrive as two batches, in that order
    let events = sink.events();
    let first_batch = events
        .iter()
        .position(|e| matches!(e, SinkEvent::Updates { .. }))
        .context("no update batch")?;
    assert!(matches!(events[first_batch + 1], SinkEvent::Metadata { .. }));

    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn test_update_after_config() -> Result<()> {
    let board = FakeBoard::start(sample_config()).await;
    let (handle, sink) = spawn(BoardConfig::new(board.host()))?;
    assert!(wait_for_metadata(&sink, "electrical.yarrboard.fake.board.name").await);

    board.push(json!({
        "msg": "update",
        "bus_voltage": 12.6,
        "channels": [{"id": 0, "state": true, "duty": 1.0}, {"id": 1, "state": true}]
    }));

    assert!(wait_for_update(&sink, "electrical.yarrboard.fake.board.bus_voltage").await);
    let updates = sink.updates();
    assert!(updates.iter().any(|u| u.path == "electrical.yarrboard.fake.pwm.0.duty"));
    assert!(!updates.iter().any(|u| u.path == "electrical.yarrboard.fake.pwm.1.state"));

    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn test_login_sent_on_open() -> Result<()> {
    let board = FakeBoard::start(sample_config()).await;
    let (handle, sink) = spawn(BoardConfig::new(board.host()).with_login("captain", "arr"))?;

    let login = board
        .wait_for_frame(WAIT, |f| f["cmd"] == "login")
        .await
        .context("no login")?;
    assert_eq!(login, json!({"cmd": "login", "user": "captain", "pass": "arr"}));
    assert!(wait_for_metadata(&sink, "electrical.yarrboard.fake.board.name").await);

    let commands = board.commands_on(1);
    assert_eq!(commands.first().map(String::as_str), Some("login"));
    assert!(commands.iter().any(|c| c == "get_config"));
    assert!(sink.events().iter().any(|e| matches!(
        e,
        SinkEvent::Status { message, .. } if message.ends_with("Logged in")
    )));

    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn test_commands_reach_board() -> Result<()> {
    let board = FakeBoard::start(sample_config()).await;
    let (handle, sink) = spawn(BoardConfig::new(board.host()))?;
    assert!(wait_for_metadata(&sink, "electrical.yarrboard.fake.board.name").await);

    let outcome = handle.set_duty(ChannelId::new(0), 0.5).await;
    assert_eq!(outcome.state, CommandState::Completed);
    let sent = board
        .wait_for_frame(WAIT, |f| f["cmd"] == "set_duty")
        .await
        .context("set_duty not received")?;
    assert_eq!(sent, json!({"cmd": "set_duty", "id": 0, "value": 0.5}));

    // Not dimmable: rejected, nothing sent
    let rejected = handle.set_duty(ChannelId::new(2), 0.5).await;
    assert_eq!(rejected.status_code, 501);

    // Disabled
    let disabled = handle.set_state(ChannelId::new(1), true).await;
    assert_eq!(disabled.status_code, 409);

    let raw = handle.submit("control", &json!({"cmd": "restart"})).await;
    assert!(raw.is_completed());
    board
        .wait_for_frame(WAIT, |f| f["cmd"] == "restart")
        .await
        .context("raw command not received")?;

    let set_duty_count = board
        .frames()
        .iter()
        .filter(|(_, f)| f["cmd"] == "set_duty")
        .count();
    assert_eq!(set_duty_count, 1);

    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn test_manager_routes_by_path() -> Result<()> {
    let board = FakeBoard::start(sample_config()).await;
    let sink = Arc::new(MemorySink::new());
    let config = BridgeConfig::new().with_board(BoardConfig::new(board.host()));
    let manager = BoardManager::start(&config, sink.clone())?;
    assert!(wait_for_metadata(&sink, "electrical.yarrboard.fake.board.name").await);

    let outcome = manager
        .submit("electrical.yarrboard.fake.pwm.0.state", &json!(true))
        .await;
    assert!(outcome.is_completed());
    let sent = board
        .wait_for_frame(WAIT, |f| f["cmd"] == "set_state")
        .await
        .context("set_state not received")?;
    assert_eq!(sent, json!({"cmd": "set_state", "id": 0, "value": true}));

    let unknown = manager
        .submit("electrical.yarrboard.other.pwm.0.state", &json!(true))
        .await;
    assert_eq!(unknown.status_code, 404);

    let handle = manager.board(&board.host()).context("board missing")?;
    manager.shutdown().await;
    assert_eq!(handle.state(), ConnectionState::Stopped);
    Ok(())
}

#[tokio::test]
async fn test_shared_hostname_is_not_routed() -> Result<()> {
    let first = FakeBoard::start(sample_config()).await;
    let second = FakeBoard::start(sample_config()).await;
    let sink = Arc::new(MemorySink::new());
    let config = BridgeConfig::new()
        .with_board(BoardConfig::new(first.host()))
        .with_board(BoardConfig::new(second.host()));
    let manager = BoardManager::start(&config, sink)?;

    for board in manager.boards() {
        let mut status = board.subscribe();
        let rooted = tokio::time::timeout(WAIT, status.wait_for(|s| s.root_path.is_some()))
            .await
            .is_ok_and(|seen| seen.is_ok());
        assert!(rooted, "{} never reported a config", board.host());
    }

    let outcome = manager
        .submit("electrical.yarrboard.fake.pwm.0.state", &json!(true))
        .await;
    assert_eq!(outcome.state, CommandState::Rejected);
    assert_eq!(outcome.status_code, 409);

    for board in [&first, &second] {
        assert!(!board.frames().iter().any(|(_, f)| f["cmd"] == "set_state"));
    }

    manager.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection() -> Result<()> {
    let board = FakeBoard::start(sample_config()).await;
    let (handle, sink) = spawn(BoardConfig::new(board.host()))?;
    assert!(wait_for_metadata(&sink, "electrical.yarrboard.fake.board.name").await);

    board.push_text("{not json");
    board.push(json!({"msg": "update", "uptime": 42}));

    assert!(wait_for_update(&sink, "electrical.yarrboard.fake.board.uptime").await);
    assert_eq!(handle.state(), ConnectionState::Open);
    assert_eq!(handle.status().retries, 0);
    assert_eq!(board.accepted(), 1);

    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn test_heartbeat_timeout_reconnects_once() -> Result<()> {
    let board = FakeBoard::start(sample_config()).await;
    let (handle, sink) = spawn(BoardConfig::new(board.host()).with_ping_interval(100))?;
    assert!(wait_for_metadata(&sink, "electrical.yarrboard.fake.board.name").await);

    board.stop_answering_pings();
    assert!(board.wait_for_connections(2, WAIT).await);

    let failures = sink
        .events()
        .iter()
        .filter(|e| matches!(e, SinkEvent::Error { .. }))
        .count();
    assert_eq!(failures, 1);
    assert!(board.commands_on(1).iter().any(|c| c == "ping"));

    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn test_reconnect_resets_metadata() -> Result<()> {
    let board = FakeBoard::start(sample_config()).await;
    let (handle, sink) = spawn(BoardConfig::new(board.host()))?;
    let path = "electrical.yarrboard.fake.pwm.0.softFuse";
    assert!(wait_for_metadata(&sink, path).await);

    sink.clear();
    board.disconnect();
    assert!(board.wait_for_connections(2, WAIT).await);

    assert!(wait_for_metadata(&sink, path).await);
    assert!(board.commands_on(2).iter().any(|c| c == "get_config"));
    assert!(wait_for_state(&handle, ConnectionState::Open).await);
    assert_eq!(handle.status().retries, 0);

    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn test_persisted_metadata_survives_reconnect() -> Result<()> {
    let board = FakeBoard::start(sample_config()).await;
    let (handle, sink) = spawn(BoardConfig::new(board.host()).with_persist_metadata())?;
    assert!(wait_for_metadata(&sink, "electrical.yarrboard.fake.board.name").await);

    sink.clear();
    board.disconnect();
    assert!(board.wait_for_connections(2, WAIT).await);
    assert!(wait_for_update(&sink, "electrical.yarrboard.fake.board.name").await);
    assert!(sink.metadata().is_empty());

    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn test_update_polling() -> Result<()> {
    let board = FakeBoard::start(sample_config()).await;
    let (handle, _sink) = spawn(BoardConfig::new(board.host()).with_update_interval(50))?;

    let poll = board.wait_for_frame(WAIT, |f| f["cmd"] == "get_update").await;
    assert!(poll.is_some());

    handle.close().await;
    Ok(())
}

#[tokio::test]
async fn test_close_stops_for_good() -> Result<()> {
    let board = FakeBoard::start(sample_config()).await;
    let (handle, sink) = spawn(BoardConfig::new(board.host()))?;
    assert!(wait_for_metadata(&sink, "electrical.yarrboard.fake.board.name").await);

    handle.close().await;
    assert_eq!(handle.state(), ConnectionState::Stopped);

    // A second close returns at once
    assert_ok!(tokio::time::timeout(Duration::from_secs(1), handle.close()).await);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(board.accepted(), 1);

    let outcome = handle.set_state(ChannelId::new(0), true).await;
    assert!(!outcome.is_completed());
    Ok(())
}

#[tokio::test]
async fn test_unreachable_board_keeps_retrying() -> Result<()> {
    let listener = assert_ok!(tokio::net::TcpListener::bind("127.0.0.1:0").await);
    let host = listener.local_addr()?.to_string();
    drop(listener);

    let (handle, _sink) = spawn(BoardConfig::new(host))?;
    let mut status = handle.subscribe();
    let retried = tokio::time::timeout(WAIT, status.wait_for(|s| s.retries >= 2))
        .await
        .is_ok_and(|seen| seen.is_ok());
    assert!(retried);

    // Connecting or waiting out the backoff, never stopped on its own
    assert_ne!(handle.state(), ConnectionState::Stopped);

    handle.close().await;
    assert_eq!(handle.state(), ConnectionState::Stopped);
    Ok(())
}

#[tokio::test]
async fn test_stalled_handshake_times_out() -> Result<()> {
    // Accepts TCP but never answers the upgrade
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let host = listener.local_addr()?.to_string();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((tcp, _)) = listener.accept().await {
            held.push(tcp);
        }
    });

    let (handle, sink) = spawn(BoardConfig::new(host).with_connect_timeout(1500))?;

    // Past one connect poll tick, still pending
    tokio::time::sleep(Duration::from_millis(1200)).await;
    let pending = handle.status();
    assert_eq!(pending.state, ConnectionState::Connecting);
    assert_eq!(pending.retries, 0);

    let mut status = handle.subscribe();
    let closed = tokio::time::timeout(
        WAIT,
        status.wait_for(|s| s.state == ConnectionState::Closed),
    )
    .await?
    .map(|seen| seen.clone())?;
    assert_eq!(closed.retries, 1);

    assert!(sink.events().iter().any(|e| matches!(
        e,
        SinkEvent::Error { message, .. } if message.contains("timeout after 1500ms")
    )));

    handle.close().await;
    assert_eq!(handle.state(), ConnectionState::Stopped);
    Ok(())
}
