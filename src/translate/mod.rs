//! Snapshot to bus translation.
//!
//! Turns config and update snapshots into [`NormalizedUpdate`] and
//! [`NormalizedMetadata`] batches rooted at `<path_prefix>.<hostname>`.
//!
//! ```text
//! electrical.yarrboard.yarrboard.board.bus_voltage   = 12.6
//! electrical.yarrboard.yarrboard.pwm.0.state         = true
//! electrical.yarrboard.yarrboard.pwm.0.duty          = 1.0
//! ```
//!
//! # Rules
//!
//! - Nothing is translated before the first config snapshot
//! - Disabled channels contribute nothing; the stored config decides
//! - Metadata for a path is emitted once until [`Translator::reset_metadata`]
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `fields` | Static units/description tables |

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashSet;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::bus::{BusSink, NormalizedMetadata, NormalizedUpdate};
use crate::protocol::{ChannelKind, DeviceConfig, UpdateSnapshot};

// ============================================================================
// Submodules
// ============================================================================

/// Field metadata tables.
pub mod fields;

// ============================================================================
// Re-exports
// ============================================================================

pub use fields::FieldMeta;

// ============================================================================
// Constants
// ============================================================================

/// Default prefix of every board root path.
pub const DEFAULT_PATH_PREFIX: &str = "electrical.yarrboard";

// ============================================================================
// Batch
// ============================================================================

/// Output of one translation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// Path/value records, in walk order.
    pub updates: Vec<NormalizedUpdate>,
    /// Metadata not yet emitted for this connection.
    pub metadata: Vec<NormalizedMetadata>,
}

impl Batch {
    /// Returns `true` if the pass produced nothing.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.metadata.is_empty()
    }

    /// Publishes updates then metadata, skipping empty halves.
    ///
    /// A refused batch is logged and dropped.
    pub fn publish(&self, sink: &dyn BusSink, source: &str) {
        if !self.updates.is_empty()
            && let Err(e) = sink.publish_updates(source, &self.updates)
        {
            warn!(host = %source, error = %e, count = self.updates.len(), "Update batch dropped");
        }

        if !self.metadata.is_empty()
            && let Err(e) = sink.publish_metadata(source, &self.metadata)
        {
            warn!(host = %source, error = %e, count = self.metadata.len(), "Metadata batch dropped");
        }
    }
}

// ============================================================================
// Translator
// ============================================================================

/// Per-board translation state.
///
/// Holds the last config snapshot and the set of paths that already had
/// metadata emitted.
#[derive(Debug)]
pub struct Translator {
    host: String,
    path_prefix: String,
    config: Option<DeviceConfig>,
    root_path: Option<String>,
    emitted: FxHashSet<String>,
}

impl Translator {
    /// Creates a translator for the board at `host`.
    #[must_use]
    pub fn new(host: impl Into<String>, path_prefix: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path_prefix: path_prefix.into(),
            config: None,
            root_path: None,
            emitted: FxHashSet::default(),
        }
    }

    /// Returns the last config snapshot, if one arrived.
    #[inline]
    #[must_use]
    pub fn config(&self) -> Option<&DeviceConfig> {
        self.config.as_ref()
    }

    /// Returns the board root path, known once a config arrived.
    #[inline]
    #[must_use]
    pub fn root_path(&self) -> Option<&str> {
        self.root_path.as_deref()
    }

    /// Forgets which paths had metadata emitted.
    pub fn reset_metadata(&mut self) {
        self.emitted.clear();
    }

    /// Replaces the stored config and translates it.
    pub fn translate_config(&mut self, config: DeviceConfig) -> Batch {
        let root = self.compute_root(&config);
        let mut pass = Pass::new(&root, &mut self.emitted);

        pass.board_fields(config.board_fields(), fields::CONFIG_BOARD_FIELDS);

        for group in config.groups() {
            for channel in group.channels().iter().filter(|c| c.is_enabled()) {
                pass.channel(group.kind(), channel.id().as_u32(), channel.fields());
            }
        }

        let batch = pass.finish();
        self.root_path = Some(root);
        self.config = Some(config);
        batch
    }

    /// Translates an update against the stored config.
    ///
    /// Returns an empty batch if no config arrived yet.
    pub fn translate_update(&mut self, update: &UpdateSnapshot) -> Batch {
        let (Some(config), Some(root)) = (self.config.as_ref(), self.root_path.as_deref()) else {
            debug!(host = %self.host, "Update before config, discarded");
            return Batch::default();
        };

        let mut pass = Pass::new(root, &mut self.emitted);

        pass.board_fields(update.board_fields(), fields::UPDATE_BOARD_FIELDS);

        for group in update.groups() {
            for channel in group.channels() {
                match config.channel(group.kind(), channel.id()) {
                    Some(known) if known.is_enabled() => {
                        pass.channel(group.kind(), channel.id().as_u32(), channel.fields());
                    }
                    Some(_) => {}
                    None => {
                        debug!(
                            host = %self.host,
                            group = group.kind().path_segment(),
                            id = %channel.id(),
                            "Unknown channel in update, skipped"
                        );
                    }
                }
            }
        }

        pass.finish()
    }

    fn compute_root(&self, config: &DeviceConfig) -> String {
        let hostname = config.hostname().unwrap_or(self.host.as_str()).replace('.', "_");
        format!("{}.{}", self.path_prefix, hostname)
    }
}

// ============================================================================
// Pass
// ============================================================================

struct Pass<'a> {
    root: &'a str,
    emitted: &'a mut FxHashSet<String>,
    batch: Batch,
}

impl<'a> Pass<'a> {
    fn new(root: &'a str, emitted: &'a mut FxHashSet<String>) -> Self {
        Self {
            root,
            emitted,
            batch: Batch::default(),
        }
    }

    fn board_fields(&mut self, present: &Map<String, Value>, table: &[(&str, FieldMeta)]) {
        for (name, meta) in table {
            if let Some(value) = present.get(*name) {
                let path = format!("{}.board.{name}", self.root);
                self.meta(&path, meta);
                self.update(path, value.clone());
            }
        }
    }

    /// Walks one channel's fields. The id is already the path segment.
    fn channel(&mut self, kind: ChannelKind, id: u32, values: &Map<String, Value>) {
        let prefix = format!("{}.{}.{id}", self.root, kind.path_segment());

        for (field, value) in values.iter().filter(|(field, _)| *field != "id") {
            let path = format!("{prefix}.{field}");
            if let Some(meta) = fields::channel_field(kind, field) {
                self.meta(&path, meta);
            }
            self.update(path, value.clone());
        }
    }

    fn update(&mut self, path: String, value: Value) {
        self.batch.updates.push(NormalizedUpdate::new(path, value));
    }

    fn meta(&mut self, path: &str, meta: &FieldMeta) {
        if self.emitted.insert(path.to_string()) {
            self.batch
                .metadata
                .push(NormalizedMetadata::new(path, meta.units, meta.description));
        }
    }

    fn finish(self) -> Batch {
        self.batch
    }
}

// ============================================================================
// Tests
// ============================================================================
