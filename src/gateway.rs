//! Host command validation.
//!
//! Hosts address controllable properties by path relative to a board root:
//!
//! | Relative path | Value | Device command |
//! |---------------|-------|----------------|
//! | `pwm.<id>.state` | `bool` | `set_state` |
//! | `pwm.<id>.duty` | number in `[0, 1]` | `set_duty` |
//! | `control` | object with a `cmd` field | forwarded verbatim |
//!
//! Every request is checked against the last config snapshot before
//! anything is sent. The resulting [`CommandOutcome`] acknowledges
//! submission only; the board may still refuse the command later.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::ChannelId;
use crate::protocol::{Channel, ChannelKind, DeviceCommand, DeviceConfig};

// ============================================================================
// Constants
// ============================================================================

/// Capability flag required for duty control.
const DIMMABLE_FLAG: &str = "isDimmable";

/// Relative path of the raw control endpoint.
const CONTROL_PATH: &str = "control";

// ============================================================================
// ControlRequest
// ============================================================================

/// A parsed host request, not yet checked against the board.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlRequest {
    /// Switch a PWM channel on or off.
    SetState {
        /// Target channel.
        channel: ChannelId,
        /// Requested state.
        value: bool,
    },
    /// Set a PWM channel's duty cycle.
    SetDuty {
        /// Target channel.
        channel: ChannelId,
        /// Requested duty, 0.0 to 1.0.
        value: f64,
    },
    /// Raw device command object.
    Raw(Value),
}

impl ControlRequest {
    /// Parses a request from a path relative to the board root.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownPath`] if no property lives at `relative`
    /// - [`Error::InvalidArgument`] if the channel id or value is malformed
    pub fn from_path(relative: &str, value: &Value) -> Result<Self> {
        let segments: Vec<&str> = relative.split('.').collect();

        match segments.as_slice() {
            [CONTROL_PATH] => Self::raw(value),
            [group, id, property] => {
                if ChannelKind::from_path_segment(group) != Some(ChannelKind::Pwm) {
                    return Err(Error::unknown_path(relative));
                }
                let channel: ChannelId = id.parse()?;
                match *property {
                    "state" => Self::state(channel, value),
                    "duty" => Self::duty(channel, value),
                    _ => Err(Error::unknown_path(relative)),
                }
            }
            _ => Err(Error::unknown_path(relative)),
        }
    }

    fn raw(value: &Value) -> Result<Self> {
        match value.get("cmd") {
            Some(Value::String(_)) if value.is_object() => Ok(Self::Raw(value.clone())),
            _ => Err(Error::invalid_argument(
                "control value must be an object with a string `cmd`",
            )),
        }
    }

    pub(crate) fn state(channel: ChannelId, value: &Value) -> Result<Self> {
        let value = value
            .as_bool()
            .ok_or_else(|| Error::invalid_argument(format!("state must be a boolean, got {value}")))?;
        Ok(Self::SetState { channel, value })
    }

    pub(crate) fn duty(channel: ChannelId, value: &Value) -> Result<Self> {
        let value = value
            .as_f64()
            .filter(|d| (0.0..=1.0).contains(d))
            .ok_or_else(|| {
                Error::invalid_argument(format!("duty must be a number from 0 to 1, got {value}"))
            })?;
        Ok(Self::SetDuty { channel, value })
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Checks a request against the last config and builds the device command.
///
/// # Errors
///
/// - [`Error::ChannelNotEnabled`] if no config is loaded, or the channel is
///   unknown or disabled
/// - [`Error::CapabilityUnsupported`] if duty is requested on a channel
///   that is not dimmable
/// - [`Error::ConfigNotLoaded`] for a raw command before the first config
pub fn validate(config: Option<&DeviceConfig>, request: &ControlRequest) -> Result<DeviceCommand> {
    match *request {
        ControlRequest::SetState { channel, value } => {
            enabled_channel(config, channel)?;
            Ok(DeviceCommand::SetState { id: channel, value })
        }
        ControlRequest::SetDuty { channel, value } => {
            let found = enabled_channel(config, channel)?;
            if !found.flag(DIMMABLE_FLAG) {
                return Err(Error::capability_unsupported(channel, DIMMABLE_FLAG));
            }
            Ok(DeviceCommand::SetDuty { id: channel, value })
        }
        ControlRequest::Raw(ref value) => {
            if config.is_none() {
                return Err(Error::ConfigNotLoaded);
            }
            Ok(DeviceCommand::Raw(value.clone()))
        }
    }
}

fn enabled_channel(
    config: Option<&DeviceConfig>,
    channel: ChannelId,
) -> Result<&Channel> {
    config
        .and_then(|c| c.channel(ChannelKind::Pwm, channel))
        .filter(|c| c.is_enabled())
        .ok_or_else(|| Error::channel_not_enabled(channel))
}

// ============================================================================
// CommandOutcome
// ============================================================================

/// Final state of a host command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandState {
    /// Sent to the board, or dropped because the link was down.
    Completed,
    /// Refused before anything was sent.
    Rejected,
}

/// Result of submitting a host command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome {
    /// Completed or rejected.
    pub state: CommandState,
    /// HTTP-like status code.
    pub status_code: u16,
    /// Reason for a rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandOutcome {
    /// Outcome of a submitted command.
    #[inline]
    #[must_use]
    pub fn completed() -> Self {
        Self {
            state: CommandState::Completed,
            status_code: 200,
            message: None,
        }
    }

    /// Rejected outcome for an error.
    ///
    /// | Error | Code |
    /// |-------|------|
    /// | [`Error::InvalidArgument`] | 400 |
    /// | [`Error::UnknownPath`] | 404 |
    /// | [`Error::ChannelNotEnabled`], [`Error::ConfigNotLoaded`], [`Error::AmbiguousPath`] | 409 |
    /// | [`Error::CapabilityUnsupported`] | 501 |
    /// | anything else | 500 |
    #[must_use]
    pub fn from_error(error: &Error) -> Self {
        let status_code = match error {
            Error::InvalidArgument { .. } => 400,
            Error::UnknownPath { .. } => 404,
            Error::ChannelNotEnabled { .. } | Error::ConfigNotLoaded | Error::AmbiguousPath { .. } => {
                409
            }
            Error::CapabilityUnsupported { .. } => 501,
            _ => 500,
        };

        Self {
            state: CommandState::Rejected,
            status_code,
            message: Some(error.to_string()),
        }
    }

    /// Returns `true` if the command was submitted.
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == CommandState::Completed
    }
}

// ============================================================================
// Tests
// ============================================================================
