//! Error types for the Yarrboard bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use yarrboard_bridge::{BridgeConfig, Result};
//!
//! fn load() -> Result<BridgeConfig> {
//!     let config = BridgeConfig::from_file("boards.json")?;
//!     config.validate()?;
//!     Ok(config)
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`] |
//! | Command | [`Error::InvalidArgument`], [`Error::UnknownPath`], [`Error::AmbiguousPath`], [`Error::ChannelNotEnabled`], [`Error::ConfigNotLoaded`], [`Error::CapabilityUnsupported`] |
//! | Bus | [`Error::Sink`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::ChannelId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// None of these are fatal to a board connection: transport errors are
/// absorbed by the reconnection loop and command errors are turned into
/// rejected [`CommandOutcome`](crate::gateway::CommandOutcome)s.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the board list is missing fields or inconsistent.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connect attempt did not resolve in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
    },

    /// The board task is gone or the socket closed.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed or unexpected frame from the board.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Command Errors
    // ========================================================================
    /// Command carried a malformed channel id or value.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// No board or command handler owns the requested path.
    #[error("Unknown path: {path}")]
    UnknownPath {
        /// The unmatched normalized path.
        path: String,
    },

    /// More than one board reports the root path that prefixes the request.
    #[error("Path {path} matches more than one board")]
    AmbiguousPath {
        /// The requested normalized path.
        path: String,
    },

    /// Channel is disabled, unknown, or no configuration has been received.
    #[error("Channel {channel} is not enabled")]
    ChannelNotEnabled {
        /// Target channel.
        channel: ChannelId,
    },

    /// Command needs the board configuration, which has not arrived yet.
    #[error("Board configuration not loaded")]
    ConfigNotLoaded,

    /// Channel lacks the capability the command needs.
    #[error("Channel {channel} does not support {capability}")]
    CapabilityUnsupported {
        /// Target channel.
        channel: ChannelId,
        /// Capability flag that was false.
        capability: &'static str,
    },

    // ========================================================================
    // Bus Errors
    // ========================================================================
    /// The external bus refused a batch.
    #[error("Bus sink error: {message}")]
    Sink {
        /// Description of the sink failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Board URL could not be built.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an unknown path error.
    #[inline]
    pub fn unknown_path(path: impl Into<String>) -> Self {
        Self::UnknownPath { path: path.into() }
    }

    /// Creates an ambiguous path error.
    #[inline]
    pub fn ambiguous_path(path: impl Into<String>) -> Self {
        Self::AmbiguousPath { path: path.into() }
    }

    /// Creates a channel not enabled error.
    #[inline]
    pub fn channel_not_enabled(channel: ChannelId) -> Self {
        Self::ChannelNotEnabled { channel }
    }

    /// Creates a capability unsupported error.
    #[inline]
    pub fn capability_unsupported(channel: ChannelId, capability: &'static str) -> Self {
        Self::CapabilityUnsupported {
            channel,
            capability,
        }
    }

    /// Creates a sink error.
    #[inline]
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is a command rejection.
    ///
    /// Rejections are reported back to the caller, never logged as faults.
    #[inline]
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. }
                | Self::UnknownPath { .. }
                | Self::AmbiguousPath { .. }
                | Self::ChannelNotEnabled { .. }
                | Self::ConfigNotLoaded
                | Self::CapabilityUnsupported { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
