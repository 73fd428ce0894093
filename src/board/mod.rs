//! Board connections.
//!
//! Each configured board runs as its own actor task; hosts talk to it
//! through a [`BoardHandle`]. [`BoardManager`] owns the whole set.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Per-board actor and its handle |
//! | `manager` | Starts, routes to and stops every board |

// ============================================================================
// Submodules
// ============================================================================

/// Per-board actor.
pub mod connection;

/// Board set owner.
pub mod manager;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{BoardConnection, BoardHandle, LinkStatus};
pub use manager::BoardManager;
