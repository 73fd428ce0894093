//! External data bus interface.
//!
//! The host supplies a [`BusSink`]; every board connection pushes its
//! translated batches and operator notices through it.
//!
//! # Delivery Contract
//!
//! - One translation pass yields at most two calls, in order:
//!   [`BusSink::publish_updates`] then [`BusSink::publish_metadata`]
//! - Empty batches are never published
//! - A failed publish is logged by the caller and not retried
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `json_lines` | Writes delta documents as JSON lines |
//! | `memory` | Records everything, for hosts and tests |

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// JSON-lines sink.
pub mod json_lines;

/// In-memory recording sink.
pub mod memory;

// ============================================================================
// Re-exports
// ============================================================================

pub use json_lines::JsonLinesSink;
pub use memory::{MemorySink, SinkEvent};

// ============================================================================
// Records
// ============================================================================

/// A single path/value observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedUpdate {
    /// Hierarchical dot-separated key.
    pub path: String,
    /// Scalar, boolean or number as reported by the board.
    pub value: Value,
}

impl NormalizedUpdate {
    /// Creates an update record.
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }
}

/// Units and description of a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetaValue {
    /// Measurement unit, empty when unitless.
    pub units: String,
    /// Human-readable description.
    pub description: String,
}

/// Static annotation for a path, sent once per connection lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedMetadata {
    /// Annotated path.
    pub path: String,
    /// Units and description.
    pub value: MetaValue,
}

impl NormalizedMetadata {
    /// Creates a metadata record.
    #[inline]
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        units: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            value: MetaValue {
                units: units.into(),
                description: description.into(),
            },
        }
    }
}

// ============================================================================
// BusSink
// ============================================================================

/// Host side of the bridge.
///
/// `source` is the configured board host. Implementations are called from
/// board tasks and must not block for long.
pub trait BusSink: Send + Sync + 'static {
    /// Publishes one batch of updates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Sink`](crate::Error::Sink) if the bus refused the batch.
    fn publish_updates(&self, source: &str, updates: &[NormalizedUpdate]) -> Result<()>;

    /// Publishes one batch of metadata.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Sink`](crate::Error::Sink) if the bus refused the batch.
    fn publish_metadata(&self, source: &str, metadata: &[NormalizedMetadata]) -> Result<()>;

    /// Surfaces an operator-visible status line.
    fn report_status(&self, source: &str, message: &str);

    /// Surfaces an operator-visible error line.
    fn report_error(&self, source: &str, message: &str);
}

// ============================================================================
// Tests
// ============================================================================
