//! Static field metadata tables.
//!
//! Built once per process and shared by reference between every board.

// ============================================================================
// Imports
// ============================================================================

use std::sync::LazyLock;

use rustc_hash::FxHashMap;

use crate::protocol::ChannelKind;

// ============================================================================
// FieldMeta
// ============================================================================

/// Units and description of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMeta {
    /// Measurement unit, empty when unitless.
    pub units: &'static str,
    /// Human-readable description.
    pub description: &'static str,
}

const fn meta(units: &'static str, description: &'static str) -> FieldMeta {
    FieldMeta { units, description }
}

// ============================================================================
// Board Fields
// ============================================================================

/// Board identity fields taken from a config snapshot, in emission order.
pub const CONFIG_BOARD_FIELDS: &[(&str, FieldMeta)] = &[
    ("firmware_version", meta("", "Firmware version of the board.")),
    ("hardware_version", meta("", "Hardware version of the board.")),
    ("name", meta("", "User defined name of the board.")),
    ("uuid", meta("", "Unique ID of the board.")),
    ("hostname", meta("", "Network hostname of the board.")),
    ("use_ssl", meta("", "Whether the board serves its socket over TLS.")),
];

/// Board telemetry fields taken from an update snapshot, in emission order.
pub const UPDATE_BOARD_FIELDS: &[(&str, FieldMeta)] = &[
    ("bus_voltage", meta("V", "Bus supply voltage")),
    ("uptime", meta("s", "Time since board restart")),
];

// ============================================================================
// Channel Fields
// ============================================================================

const COMMON_FIELDS: &[(&str, FieldMeta)] = &[
    ("name", meta("", "User defined name of channel.")),
    (
        "enabled",
        meta("", "Whether or not this channel is in use or should be ignored."),
    ),
];

const PWM_FIELDS: &[(&str, FieldMeta)] = &[
    ("type", meta("", "Channel type.  Currently only 'mosfet'.")),
    (
        "hasPWM",
        meta("", "Whether this channel hardware is capable of PWM (duty cycle, dimming, etc)"),
    ),
    ("hasCurrent", meta("", "Whether this channel has current monitoring.")),
    ("softFuse", meta("A", "Software defined fuse, in amps.")),
    ("isDimmable", meta("", "Whether the channel has dimming enabled or not.")),
    ("state", meta("", "Whether the channel is on or not.")),
    ("duty", meta("%", "Duty cycle as a percentage from 0 to 1")),
    ("current", meta("A", "Current in amps")),
    ("aH", meta("aH", "Consumed amp hours since board restart")),
    ("wH", meta("wH", "Consumed watt hours since board restart")),
];

const SWITCH_FIELDS: &[(&str, FieldMeta)] = &[
    ("state", meta("", "Whether the switch is closed or not.")),
];

const ADC_FIELDS: &[(&str, FieldMeta)] = &[
    ("value", meta("", "Raw reading of the analog input.")),
    ("voltage", meta("V", "Voltage at the analog input.")),
];

const RGB_FIELDS: &[(&str, FieldMeta)] = &[
    ("red", meta("", "Red level from 0 to 1")),
    ("green", meta("", "Green level from 0 to 1")),
    ("blue", meta("", "Blue level from 0 to 1")),
];

type FieldTable = FxHashMap<&'static str, FieldMeta>;

static CHANNEL_TABLES: LazyLock<FxHashMap<ChannelKind, FieldTable>> = LazyLock::new(|| {
    ChannelKind::ALL
        .into_iter()
        .map(|kind| {
            let specific = match kind {
                ChannelKind::Pwm => PWM_FIELDS,
                ChannelKind::Switch => SWITCH_FIELDS,
                ChannelKind::Adc => ADC_FIELDS,
                ChannelKind::Rgb => RGB_FIELDS,
            };
            let table = COMMON_FIELDS.iter().chain(specific).copied().collect();
            (kind, table)
        })
        .collect()
});

/// Looks up the metadata of a channel field.
///
/// Fields without an entry are still published as updates, never as
/// metadata.
#[inline]
#[must_use]
pub fn channel_field(kind: ChannelKind, field: &str) -> Option<&'static FieldMeta> {
    CHANNEL_TABLES.get(&kind).and_then(|table| table.get(field))
}

// ============================================================================
// Tests
// ============================================================================
