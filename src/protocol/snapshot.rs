//! Board snapshots: configuration and periodic updates.
//!
//! Both snapshot kinds share one shape: a flat set of board-level fields
//! plus zero or more channel groups, each an array of channel objects.
//!
//! ```json
//! {
//!   "msg": "config",
//!   "hostname": "yarrboard",
//!   "firmware_version": "1.2.0",
//!   "pwm": [
//!     { "id": 0, "name": "Bilge", "enabled": true, "isDimmable": true, "softFuse": 20.0 }
//!   ],
//!   "adc": [ { "id": 0, "enabled": false } ]
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::ChannelId;

// ============================================================================
// Constants
// ============================================================================

/// Envelope key carrying the message kind; never treated as a board field.
const MESSAGE_KIND_KEY: &str = "msg";

// ============================================================================
// ChannelKind
// ============================================================================

/// Channel group kinds a board may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Dimmable MOSFET outputs.
    Pwm,
    /// Plain on/off switch inputs.
    Switch,
    /// Analog inputs.
    Adc,
    /// RGB LED outputs.
    Rgb,
}

impl ChannelKind {
    /// Every kind, in the order boards report them.
    pub const ALL: [Self; 4] = [Self::Pwm, Self::Switch, Self::Adc, Self::Rgb];

    /// Path segment used below the board root.
    #[inline]
    #[must_use]
    pub const fn path_segment(&self) -> &'static str {
        match self {
            Self::Pwm => "pwm",
            Self::Switch => "switch",
            Self::Adc => "adc",
            Self::Rgb => "rgb",
        }
    }

    /// Maps a snapshot key to its group kind.
    ///
    /// Older firmware reports its outputs under `channels`.
    #[must_use]
    pub fn from_snapshot_key(key: &str) -> Option<Self> {
        match key {
            "pwm" | "channels" => Some(Self::Pwm),
            "switches" => Some(Self::Switch),
            "adc" => Some(Self::Adc),
            "rgb" => Some(Self::Rgb),
            _ => None,
        }
    }

    /// Maps a path segment back to its group kind.
    #[must_use]
    pub fn from_path_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.path_segment() == segment)
    }
}

// ============================================================================
// Channel
// ============================================================================

/// One channel descriptor, fields kept in device order.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    id: ChannelId,
    fields: Map<String, Value>,
}

impl Channel {
    /// Parses a channel object. The `id` field is mandatory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the entry is not an object or its id
    /// is neither a non-negative integer nor a string holding one.
    pub fn from_value(kind: ChannelKind, value: Value) -> Result<Self> {
        let Value::Object(fields) = value else {
            return Err(Error::protocol(format!(
                "{} channel entry is not an object",
                kind.path_segment()
            )));
        };

        let id = fields
            .get("id")
            .and_then(|id| ChannelId::from_json(id).ok())
            .ok_or_else(|| {
                Error::protocol(format!(
                    "{} channel entry has no valid id",
                    kind.path_segment()
                ))
            })?;

        Ok(Self { id, fields })
    }

    /// Returns the channel id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Returns every field, in device order.
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns `true` if the board marks the channel as in use.
    ///
    /// A missing flag means disabled.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.flag("enabled")
    }

    /// Returns a boolean field, `false` if absent or not a boolean.
    #[inline]
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.fields
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or_default()
    }
}

// ============================================================================
// ChannelGroup
// ============================================================================

/// Ordered channels of one kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelGroup {
    kind: ChannelKind,
    channels: Vec<Channel>,
}

impl ChannelGroup {
    /// Returns the group kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Returns the channels in snapshot order.
    #[inline]
    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Looks up a channel by id.
    #[must_use]
    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Board fields and channel groups split out of a snapshot object.
#[derive(Debug, Clone, Default, PartialEq)]
struct Sections {
    board: Map<String, Value>,
    groups: Vec<ChannelGroup>,
}

impl Sections {
    fn parse(object: Map<String, Value>) -> Result<Self> {
        let mut sections = Self::default();

        for (key, value) in object {
            if key == MESSAGE_KIND_KEY {
                continue;
            }

            let Some(kind) = ChannelKind::from_snapshot_key(&key) else {
                sections.board.insert(key, value);
                continue;
            };

            let Value::Array(entries) = value else {
                return Err(Error::protocol(format!("channel group `{key}` is not an array")));
            };

            let channels = entries
                .into_iter()
                .map(|entry| Channel::from_value(kind, entry))
                .collect::<Result<Vec<_>>>()?;

            // `pwm` and legacy `channels` land in the same group
            match sections.groups.iter_mut().find(|g| g.kind == kind) {
                Some(group) => group.channels.extend(channels),
                None => sections.groups.push(ChannelGroup { kind, channels }),
            }
        }

        Ok(sections)
    }
}

// ============================================================================
// DeviceConfig
// ============================================================================

/// Last configuration snapshot received from a board.
///
/// Replaced wholesale on every config message.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    sections: Sections,
}

impl DeviceConfig {
    /// Parses a config message body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if a channel group is malformed.
    pub fn from_object(object: Map<String, Value>) -> Result<Self> {
        Ok(Self {
            sections: Sections::parse(object)?,
        })
    }

    /// Board-level fields (identity, versions, flags).
    #[inline]
    #[must_use]
    pub fn board_fields(&self) -> &Map<String, Value> {
        &self.sections.board
    }

    /// Channel groups in snapshot order.
    #[inline]
    #[must_use]
    pub fn groups(&self) -> &[ChannelGroup] {
        &self.sections.groups
    }

    /// Returns the group of the given kind, if the board has one.
    #[must_use]
    pub fn group(&self, kind: ChannelKind) -> Option<&ChannelGroup> {
        self.sections.groups.iter().find(|g| g.kind == kind)
    }

    /// Looks up a channel by kind and id.
    #[must_use]
    pub fn channel(&self, kind: ChannelKind, id: ChannelId) -> Option<&Channel> {
        self.group(kind).and_then(|g| g.channel(id))
    }

    /// Hostname the board reports for itself, if non-empty.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.board_str("hostname")
    }

    /// User-defined board name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.board_str("name")
    }

    /// Board unique id.
    #[must_use]
    pub fn uuid(&self) -> Option<&str> {
        self.board_str("uuid")
    }

    fn board_str(&self, key: &str) -> Option<&str> {
        self.sections
            .board
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

// ============================================================================
// UpdateSnapshot
// ============================================================================

/// Periodic telemetry snapshot.
///
/// Channel entries usually omit `enabled`; the stored [`DeviceConfig`] is
/// authoritative for it.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSnapshot {
    sections: Sections,
}

impl UpdateSnapshot {
    /// Parses an update message body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if a channel group is malformed.
    pub fn from_object(object: Map<String, Value>) -> Result<Self> {
        Ok(Self {
            sections: Sections::parse(object)?,
        })
    }

    /// Board-level telemetry fields.
    #[inline]
    #[must_use]
    pub fn board_fields(&self) -> &Map<String, Value> {
        &self.sections.board
    }

    /// Channel groups in snapshot order.
    #[inline]
    #[must_use]
    pub fn groups(&self) -> &[ChannelGroup] {
        &self.sections.groups
    }
}

// ============================================================================
// Tests
// ============================================================================
