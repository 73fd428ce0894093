//! WebSocket transport layer.
//!
//! Everything below the board connection actor: the socket itself, the
//! application-level heartbeat and the reconnect backoff.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │ BoardConnection │                              │  Yarrboard      │
//! │                 │         WebSocket            │                 │
//! │  Transport      │◄────────────────────────────►│  /ws endpoint   │
//! │  Heartbeat      │     ws[s]://<host>/ws        │                 │
//! │  ReconnectPolicy│                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Transport::open` - Connect, polled every second until it resolves
//! 2. `Heartbeat::check` - Ping every interval while open
//! 3. `ReconnectPolicy::record_failure` - Back off after any close or fault
//! 4. `Transport::close` - Owner shutdown, no further attempts
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `heartbeat` | Pong tracking and timeout detection |
//! | `reconnect` | Connection states and backoff |
//! | `socket` | WebSocket client |

// ============================================================================
// Submodules
// ============================================================================

/// Pong tracking.
pub mod heartbeat;

/// Connection states and backoff.
pub mod reconnect;

/// WebSocket client.
pub mod socket;

// ============================================================================
// Re-exports
// ============================================================================

pub use heartbeat::{Beat, Heartbeat};
pub use reconnect::{ConnectionState, ReconnectPolicy, backoff_delay};
pub use socket::{Transport, TransportEvent};
