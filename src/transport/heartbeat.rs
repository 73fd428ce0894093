//! Application-level liveness check.
//!
//! Every interval the owner calls [`Heartbeat::check`]. If no pong arrived
//! within two intervals the link is considered dead, which catches
//! half-open TCP connections the socket itself never reports.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;

// ============================================================================
// Constants
// ============================================================================

/// Default ping interval.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(1);

// ============================================================================
// Beat
// ============================================================================

/// What the owner should do on this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    /// Link alive; send a ping.
    Ping,
    /// No pong for too long; force-close.
    Timeout {
        /// Time since the last pong.
        silent: Duration,
    },
}

// ============================================================================
// Heartbeat
// ============================================================================

/// Tracks time since the last pong.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: Duration,
    last_pong: Instant,
}

impl Heartbeat {
    /// Starts a monitor as if a pong had just arrived at `now`.
    #[inline]
    #[must_use]
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_pong: now,
        }
    }

    /// Ping interval.
    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Silence after which the link is declared dead.
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.interval.saturating_mul(2)
    }

    /// Records a pong.
    #[inline]
    pub fn record_pong(&mut self, now: Instant) {
        self.last_pong = now;
    }

    /// Decides the action for a tick at `now`.
    #[must_use]
    pub fn check(&self, now: Instant) -> Beat {
        let silent = now.saturating_duration_since(self.last_pong);
        if silent > self.timeout() {
            Beat::Timeout { silent }
        } else {
            Beat::Ping
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
