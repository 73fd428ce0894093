//! Connection states and reconnect backoff.
//!
//! ```text
//! Disconnected ──► Connecting ──► Open ──► Closing ──► Closed
//!                      ▲                                  │
//!                      └──────────── backoff ◄────────────┘
//!
//! any state ──(owner close)──► Stopped
//! ```
//!
//! The delay before the next attempt is
//! `clamp(max(500ms, retries * 1000ms), 500ms, 60s)`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Shortest wait between attempts.
pub const MIN_RECONNECT_DELAY: Duration = Duration::from_millis(500);

/// Longest wait between attempts.
pub const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

/// Delay added per consecutive failure.
const RECONNECT_STEP: Duration = Duration::from_millis(1000);

/// How often a pending connect attempt is checked on.
pub const CONNECT_POLL_INTERVAL: Duration = Duration::from_secs(1);

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of one board connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Created, never attempted.
    #[default]
    Disconnected,
    /// Attempt in flight.
    Connecting,
    /// Socket open; heartbeat running.
    Open,
    /// Tearing the socket down after a fault.
    Closing,
    /// Socket gone; waiting out the backoff.
    Closed,
    /// Closed by the owner. Terminal.
    Stopped,
}

impl ConnectionState {
    /// Returns `true` once the owner has closed the connection.
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Backoff
// ============================================================================

/// Delay before the next attempt after `retries` consecutive failures.
#[must_use]
pub fn backoff_delay(retries: u32) -> Duration {
    RECONNECT_STEP
        .saturating_mul(retries)
        .max(MIN_RECONNECT_DELAY)
        .clamp(MIN_RECONNECT_DELAY, MAX_RECONNECT_DELAY)
}

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Consecutive failure counter driving the backoff.
#[derive(Debug, Clone, Default)]
pub struct ReconnectPolicy {
    retries: u32,
}

impl ReconnectPolicy {
    /// Creates a policy with no recorded failures.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consecutive failures since the last successful open.
    #[inline]
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Records a failure and returns how long to wait before retrying.
    pub fn record_failure(&mut self) -> Duration {
        self.retries = self.retries.saturating_add(1);
        backoff_delay(self.retries)
    }

    /// Clears the failure count after a successful open.
    #[inline]
    pub fn reset(&mut self) {
        self.retries = 0;
    }
}

// ============================================================================
// Tests
// ============================================================================
