//! Type-safe identifiers.
//!
//! Boards number their channels with small non-negative integers, unique
//! within one channel group.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// ChannelId
// ============================================================================

/// Identifier of a channel within its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(u32);

impl ChannelId {
    /// Creates a channel ID.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID.
    #[inline]
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Reads a channel ID from a JSON value.
    ///
    /// Accepts non-negative integers and strings holding one, since command
    /// paths carry the id as text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for anything else.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Self)
                .ok_or_else(|| Error::invalid_argument(format!("invalid channel id: {n}"))),
            Value::String(s) => s.parse(),
            other => Err(Error::invalid_argument(format!(
                "invalid channel id: {other}"
            ))),
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChannelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|_| Error::invalid_argument(format!("invalid channel id: {s:?}")))
    }
}

impl From<u32> for ChannelId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

// ============================================================================
// Tests
// ============================================================================
