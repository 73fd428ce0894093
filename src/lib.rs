//! Yarrboard bridge - Multi-board WebSocket client for Yarrboard power
//! distribution boards.
//!
//! This library keeps a persistent connection to each configured board and
//! turns its JSON message stream into normalized path/value updates for an
//! external data bus.
//!
//! # Architecture
//!
//! Every board is an independent actor task:
//!
//! - **Transport**: WebSocket to `ws[s]://<host>/ws`, heartbeat, backoff
//! - **Dispatcher**: classifies each inbound frame
//! - **Translator**: config/update snapshots to deduplicated bus batches
//! - **Gateway**: validates host commands against the last config
//!
//! Key design principles:
//!
//! - One `select!` loop per board; no shared mutable state between boards
//! - Nothing is translated or controlled before the first config snapshot
//! - Transport faults are never fatal; the board reconnects forever
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use yarrboard_bridge::{BoardConfig, BoardManager, BridgeConfig, ChannelId, JsonLinesSink, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = BridgeConfig::new()
//!         .with_board(BoardConfig::new("yarrboard.local"));
//!
//!     // Batches go to stdout as JSON lines
//!     let manager = BoardManager::start(&config, Arc::new(JsonLinesSink::stdout()))?;
//!
//!     if let Some(board) = manager.board("yarrboard.local") {
//!         let outcome = board.set_state(ChannelId::new(0), true).await;
//!         println!("set_state: {}", outcome.status_code);
//!     }
//!
//!     manager.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`board`] | Board actors: [`BoardManager`], [`BoardHandle`] |
//! | [`bus`] | External bus interface: [`BusSink`] and shipped sinks |
//! | [`config`] | Board list: [`BridgeConfig`], [`BoardConfig`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`gateway`] | Host command validation |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Board wire messages |
//! | [`translate`] | Snapshot to bus translation |
//! | [`transport`] | Socket, heartbeat and backoff |

// ============================================================================
// Modules
// ============================================================================

/// Board actors and their owner.
///
/// - [`BoardManager`] - Starts every board and routes host commands
/// - [`BoardHandle`] - Talks to one running board
pub mod board;

/// External data bus interface.
pub mod bus;

/// Static board configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Host command validation and outcomes.
pub mod gateway;

/// Type-safe identifiers.
pub mod identifiers;

/// Board wire protocol.
///
/// Outbound commands, inbound frame classification, snapshot model.
pub mod protocol;

/// Snapshot to bus translation.
pub mod translate;

/// WebSocket transport layer.
///
/// Socket client, heartbeat monitor and reconnect backoff.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Board types
pub use board::{BoardConnection, BoardHandle, BoardManager, LinkStatus};

// Bus types
pub use bus::{BusSink, JsonLinesSink, MemorySink, NormalizedMetadata, NormalizedUpdate};

// Configuration types
pub use config::{BoardConfig, BridgeConfig};

// Error types
pub use error::{Error, Result};

// Command types
pub use gateway::{CommandOutcome, CommandState, ControlRequest};

// Identifier types
pub use identifiers::ChannelId;

// Transport types
pub use transport::ConnectionState;
