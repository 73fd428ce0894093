//! Commands sent to a board.
//!
//! Every request is a flat JSON object tagged by `cmd`:
//!
//! | Command | Body |
//! |---------|------|
//! | `get_config` | - |
//! | `get_update` | - |
//! | `ping` | - |
//! | `login` | `user`, `pass` |
//! | `set_state` | `id`, `value: bool` |
//! | `set_duty` | `id`, `value: f64` |

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::ChannelId;

// ============================================================================
// DeviceCommand
// ============================================================================

/// A request from the bridge to a board.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum DeviceCommand {
    /// Ask for a full configuration snapshot.
    GetConfig,

    /// Ask for a telemetry snapshot.
    GetUpdate,

    /// Liveness check, answered with `{"pong": true}`.
    Ping,

    /// Submit credentials.
    Login {
        /// Username.
        user: String,
        /// Password.
        pass: String,
    },

    /// Switch a channel on or off.
    SetState {
        /// Target channel.
        id: ChannelId,
        /// Requested state.
        value: bool,
    },

    /// Set a channel's duty cycle, 0.0 to 1.0.
    SetDuty {
        /// Target channel.
        id: ChannelId,
        /// Requested duty.
        value: f64,
    },

    /// Pre-built command forwarded verbatim.
    #[serde(skip)]
    Raw(Value),
}

impl DeviceCommand {
    /// Creates a login command.
    #[inline]
    #[must_use]
    pub fn login(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self::Login {
            user: user.into(),
            pass: pass.into(),
        }
    }

    /// Serializes the command to its wire text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let text = match self {
            Self::Raw(value) => serde_json::to_string(value)?,
            command => serde_json::to_string(command)?,
        };
        Ok(text)
    }

    /// Short name for logging.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::GetConfig => "get_config",
            Self::GetUpdate => "get_update",
            Self::Ping => "ping",
            Self::Login { .. } => "login",
            Self::SetState { .. } => "set_state",
            Self::SetDuty { .. } => "set_duty",
            Self::Raw(value) => value.get("cmd").and_then(Value::as_str).unwrap_or("raw"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
