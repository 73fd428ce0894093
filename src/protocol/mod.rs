//! Board wire protocol.
//!
//! JSON text frames over a WebSocket at `ws[s]://<host>/ws`.
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`DeviceCommand`] | Bridge → Board | Requests and control |
//! | [`InboundMessage`] | Board → Bridge | Snapshots, pong, status |
//! | [`DeviceConfig`] / [`UpdateSnapshot`] | Board → Bridge | Snapshot bodies |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Outbound commands |
//! | `message` | Inbound frame classification |
//! | `snapshot` | Config and update snapshot model |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound device commands.
pub mod command;

/// Inbound frame classification.
pub mod message;

/// Config and update snapshots.
pub mod snapshot;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::DeviceCommand;
pub use message::InboundMessage;
pub use snapshot::{Channel, ChannelGroup, ChannelKind, DeviceConfig, UpdateSnapshot};
