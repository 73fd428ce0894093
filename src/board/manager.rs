//! Owner of every configured board.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use yarrboard_bridge::{BoardManager, BridgeConfig, JsonLinesSink};
//!
//! # async fn example() -> yarrboard_bridge::Result<()> {
//! let config = BridgeConfig::from_file("boards.json")?;
//! let manager = BoardManager::start(&config, Arc::new(JsonLinesSink::stdout()))?;
//!
//! let outcome = manager
//!     .submit("electrical.yarrboard.yb.pwm.0.state", &serde_json::json!(true))
//!     .await;
//! println!("{}", outcome.status_code);
//!
//! manager.shutdown().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{info, warn};

use crate::bus::BusSink;
use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::gateway::CommandOutcome;

use super::connection::{BoardConnection, BoardHandle};

// ============================================================================
// Types
// ============================================================================

/// Shared state behind every manager clone.
struct ManagerInner {
    /// Running boards by configured host.
    boards: Mutex<FxHashMap<String, BoardHandle>>,
}

// ============================================================================
// BoardManager
// ============================================================================

/// Runs one connection per configured board and routes host commands.
///
/// Boards are independent: one board failing never affects another.
#[derive(Clone)]
pub struct BoardManager {
    inner: Arc<ManagerInner>,
}

impl fmt::Debug for BoardManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardManager")
            .field("board_count", &self.board_count())
            .finish_non_exhaustive()
    }
}

impl BoardManager {
    /// Validates `config` and starts every board on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid. No board
    /// is started in that case.
    pub fn start(config: &BridgeConfig, sink: Arc<dyn BusSink>) -> Result<Self> {
        config.validate()?;

        let mut boards = FxHashMap::default();
        for board in &config.boards {
            let handle = BoardConnection::spawn(board.clone(), &config.path_prefix, Arc::clone(&sink))?;
            boards.insert(board.host.clone(), handle);
        }

        info!(count = boards.len(), "Boards started");

        Ok(Self {
            inner: Arc::new(ManagerInner {
                boards: Mutex::new(boards),
            }),
        })
    }

    /// Returns the handle of the board configured with `host`.
    #[must_use]
    pub fn board(&self, host: &str) -> Option<BoardHandle> {
        self.inner.boards.lock().get(host.trim()).cloned()
    }

    /// Returns every running board.
    #[must_use]
    pub fn boards(&self) -> Vec<BoardHandle> {
        self.inner.boards.lock().values().cloned().collect()
    }

    /// Number of running boards.
    #[inline]
    #[must_use]
    pub fn board_count(&self) -> usize {
        self.inner.boards.lock().len()
    }

    /// Routes a command by its full normalized path.
    ///
    /// The owning board is the one whose root path prefixes `path`. Boards
    /// without a config yet have no root path and cannot be addressed. If
    /// several boards report the same root, nothing is sent and the command
    /// is rejected with [`Error::AmbiguousPath`].
    pub async fn submit(&self, path: &str, value: &Value) -> CommandOutcome {
        let mut targets: Vec<(BoardHandle, String)> = self
            .inner
            .boards
            .lock()
            .values()
            .filter_map(|handle| {
                let root = handle.root_path()?;
                let relative = path.strip_prefix(root.as_str())?.strip_prefix('.')?;
                Some((handle.clone(), relative.to_string()))
            })
            .collect();

        match targets.len() {
            0 => CommandOutcome::from_error(&Error::unknown_path(path)),
            1 => {
                let (handle, relative) = targets.swap_remove(0);
                handle.submit(&relative, value).await
            }
            count => {
                let hosts: Vec<&str> = targets.iter().map(|(handle, _)| handle.host()).collect();
                warn!(path, count, ?hosts, "Path matches more than one board");
                CommandOutcome::from_error(&Error::ambiguous_path(path))
            }
        }
    }

    /// Closes every board and waits for their sockets to close.
    pub async fn shutdown(&self) {
        let boards: Vec<BoardHandle> = {
            let mut map = self.inner.boards.lock();
            map.drain().map(|(_, handle)| handle).collect()
        };

        info!(count = boards.len(), "Shutting down all boards");

        join_all(boards.iter().map(|board| board.close())).await;
    }
}

// ============================================================================
// Tests
// ============================================================================
