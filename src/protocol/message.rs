//! Inbound frame classification.
//!
//! Each text frame from a board is one JSON object. Classification is by
//! well-known top-level keys, first match wins:
//!
//! | Order | Marker | Classified as |
//! |-------|--------|---------------|
//! | 1 | `"msg": "update"` | [`InboundMessage::Update`] |
//! | 2 | `"msg": "config"` | [`InboundMessage::Config`] |
//! | 3 | `"pong": true` | [`InboundMessage::Pong`] |
//! | 4 | `"error": "..."` or `msg=status, status=error` | [`InboundMessage::Error`] |
//! | 5 | `"success": "..."` or `msg=status, status=success` | [`InboundMessage::Success`] |
//! | 6 | anything else | [`InboundMessage::Other`] |

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value};

use crate::error::{Error, Result};

use super::snapshot::{DeviceConfig, UpdateSnapshot};

// ============================================================================
// InboundMessage
// ============================================================================

/// A classified frame from a board.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Periodic telemetry snapshot.
    Update(UpdateSnapshot),
    /// Full configuration snapshot.
    Config(Box<DeviceConfig>),
    /// Heartbeat answer.
    Pong,
    /// Board-reported error text.
    Error(String),
    /// Board-reported success text.
    Success(String),
    /// Unrecognized object, kept for logging.
    Other(Value),
}

impl InboundMessage {
    /// Parses and classifies one text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the frame is not JSON
    /// - [`Error::Protocol`] if it is not an object, or a config/update
    ///   body is malformed
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(object) = value else {
            return Err(Error::protocol("frame is not a JSON object"));
        };
        Self::classify(object)
    }

    /// Short label for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Update(_) => "update",
            Self::Config(_) => "config",
            Self::Pong => "pong",
            Self::Error(_) => "error",
            Self::Success(_) => "success",
            Self::Other(_) => "other",
        }
    }

    fn classify(object: Map<String, Value>) -> Result<Self> {
        let msg = object.get("msg").and_then(Value::as_str);

        if msg == Some("update") {
            return Ok(Self::Update(UpdateSnapshot::from_object(object)?));
        }

        if msg == Some("config") {
            return Ok(Self::Config(Box::new(DeviceConfig::from_object(object)?)));
        }

        if object.get("pong").and_then(Value::as_bool) == Some(true) {
            return Ok(Self::Pong);
        }

        if let Some(text) = object.get("error").and_then(Value::as_str) {
            return Ok(Self::Error(text.to_string()));
        }

        let status = object.get("status").and_then(Value::as_str);
        let status_text = || {
            object
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        if msg == Some("status") && status == Some("error") {
            return Ok(Self::Error(status_text()));
        }

        if let Some(text) = object.get("success").and_then(Value::as_str) {
            return Ok(Self::Success(text.to_string()));
        }

        if msg == Some("status") && status == Some("success") {
            return Ok(Self::Success(status_text()));
        }

        Ok(Self::Other(Value::Object(object)))
    }
}

// ============================================================================
// Tests
// ============================================================================
