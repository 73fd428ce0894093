//! Fake Yarrboard for integration tests.
//!
//! Listens on a random local port, answers `get_config`, `ping` and
//! `login`, and records every command it receives.

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Logging
// ============================================================================

/// Installs a test subscriber once; `RUST_LOG` selects the level.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Fixtures
// ============================================================================

/// Config snapshot with one dimmable, one plain and one disabled channel.
pub fn sample_config() -> Value {
    json!({
        "msg": "config",
        "hostname": "fake",
        "firmware_version": "1.2.0",
        "name": "Test Bench",
        "pwm": [
            {"id": 0, "name": "Bilge", "enabled": true, "isDimmable": true, "softFuse": 20.0},
            {"id": 1, "name": "Spare", "enabled": false, "isDimmable": true},
            {"id": 2, "name": "Pump", "enabled": true, "isDimmable": false}
        ]
    })
}

// ============================================================================
// FakeBoard
// ============================================================================

enum Outgoing {
    Frame(String),
    Close,
}

struct Shared {
    config: Value,
    answer_pong: AtomicBool,
    accepted: AtomicUsize,
    frames: Mutex<Vec<(usize, Value)>>,
    current: Mutex<Option<mpsc::UnboundedSender<Outgoing>>>,
}

/// A scripted board on `127.0.0.1`.
pub struct FakeBoard {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

impl FakeBoard {
    /// Starts a board that answers pings.
    pub async fn start(config: Value) -> Self {
        init_logging();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = Arc::new(Shared {
            config,
            answer_pong: AtomicBool::new(true),
            accepted: AtomicUsize::new(0),
            frames: Mutex::new(Vec::new()),
            current: Mutex::new(None),
        });

        let accept_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                let index = accept_shared.accepted.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::spawn(serve(tcp, index, Arc::clone(&accept_shared)));
            }
        });

        Self { addr, shared }
    }

    /// `host:port` to put in a board config.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    /// Stops answering pings, simulating a half-open link.
    pub fn stop_answering_pings(&self) {
        self.shared.answer_pong.store(false, Ordering::SeqCst);
    }

    /// Number of connections accepted so far.
    pub fn accepted(&self) -> usize {
        self.shared.accepted.load(Ordering::SeqCst)
    }

    /// Every command received, with the connection index it arrived on.
    pub fn frames(&self) -> Vec<(usize, Value)> {
        self.shared.frames.lock().clone()
    }

    /// Command names received on one connection, in order.
    pub fn commands_on(&self, connection: usize) -> Vec<String> {
        self.frames()
            .into_iter()
            .filter(|(index, _)| *index == connection)
            .filter_map(|(_, frame)| frame.get("cmd").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    /// Sends a frame on the latest connection.
    pub fn push(&self, frame: Value) {
        self.push_text(frame.to_string());
    }

    /// Sends raw text on the latest connection.
    pub fn push_text(&self, text: impl Into<String>) {
        if let Some(tx) = self.shared.current.lock().as_ref() {
            let _ = tx.send(Outgoing::Frame(text.into()));
        }
    }

    /// Closes the latest connection from the board side.
    pub fn disconnect(&self) {
        if let Some(tx) = self.shared.current.lock().take() {
            let _ = tx.send(Outgoing::Close);
        }
    }

    /// Waits until a received command matches.
    pub async fn wait_for_frame<F>(&self, limit: Duration, predicate: F) -> Option<Value>
    where
        F: Fn(&Value) -> bool,
    {
        self.wait_until(limit, || {
            self.frames()
                .into_iter()
                .map(|(_, frame)| frame)
                .find(|frame| predicate(frame))
        })
        .await
    }

    /// Waits until `accepted() >= count`.
    pub async fn wait_for_connections(&self, count: usize, limit: Duration) -> bool {
        self.wait_until(limit, || (self.accepted() >= count).then_some(()))
            .await
            .is_some()
    }

    async fn wait_until<T>(&self, limit: Duration, check: impl Fn() -> Option<T>) -> Option<T> {
        let poll = async {
            loop {
                if let Some(found) = check() {
                    return found;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(limit, poll).await.ok()
    }
}

async fn serve(tcp: TcpStream, index: usize, shared: Arc<Shared>) {
    let Ok(ws) = accept_async(tcp).await else {
        return;
    };
    let (mut write, mut read) = ws.split();

    let (tx, mut rx) = mpsc::unbounded_channel();
    *shared.current.lock() = Some(tx.clone());

    loop {
        tokio::select! {
            incoming = read.next() => {
                let Some(Ok(Message::Text(text))) = incoming else {
                    break;
                };
                let Ok(frame) = serde_json::from_str::<Value>(text.as_str()) else {
                    continue;
                };

                let reply = match frame.get("cmd").and_then(Value::as_str) {
                    Some("get_config") => Some(shared.config.clone()),
                    Some("ping") if shared.answer_pong.load(Ordering::SeqCst) => {
                        Some(json!({"pong": true}))
                    }
                    Some("login") => Some(json!({"success": "Logged in"})),
                    _ => None,
                };

                shared.frames.lock().push((index, frame));

                if let Some(reply) = reply {
                    let _ = tx.send(Outgoing::Frame(reply.to_string()));
                }
            }

            outgoing = rx.recv() => {
                match outgoing {
                    Some(Outgoing::Frame(text)) => {
                        if write.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Outgoing::Close) | None => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }
}
