//! Sink writing Signal K style delta documents, one JSON object per line.
//!
//! ```json
//! {"source":"yarrboard.local","updates":[{"values":[{"path":"...","value":1}]}]}
//! {"source":"yarrboard.local","updates":[{"meta":[{"path":"...","value":{"units":"A","description":"..."}}]}]}
//! ```
//!
//! Status and error notices go to `tracing`, not to the writer.

// ============================================================================
// Imports
// ============================================================================

use std::io::Write;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{error, info};

use crate::error::{Error, Result};

use super::{BusSink, NormalizedMetadata, NormalizedUpdate};

// ============================================================================
// Wire Documents
// ============================================================================

#[derive(Serialize)]
struct Delta<'a, T: Serialize> {
    source: &'a str,
    updates: [T; 1],
}

#[derive(Serialize)]
struct Values<'a> {
    values: &'a [NormalizedUpdate],
}

#[derive(Serialize)]
struct Meta<'a> {
    meta: &'a [NormalizedMetadata],
}

// ============================================================================
// JsonLinesSink
// ============================================================================

/// Writes each batch as one line to the wrapped writer.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send + 'static> JsonLinesSink<W> {
    /// Wraps a writer.
    #[inline]
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the writer, consuming the sink.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_line<T: Serialize>(&self, document: &T) -> Result<()> {
        let line = serde_json::to_string(document)?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{line}")
            .and_then(|()| writer.flush())
            .map_err(|e| Error::sink(format!("write failed: {e}")))
    }
}

impl JsonLinesSink<std::io::Stdout> {
    /// Sink on standard output.
    #[inline]
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send + 'static> BusSink for JsonLinesSink<W> {
    fn publish_updates(&self, source: &str, updates: &[NormalizedUpdate]) -> Result<()> {
        self.write_line(&Delta {
            source,
            updates: [Values { values: updates }],
        })
    }

    fn publish_metadata(&self, source: &str, metadata: &[NormalizedMetadata]) -> Result<()> {
        self.write_line(&Delta {
            source,
            updates: [Meta { meta: metadata }],
        })
    }

    fn report_status(&self, source: &str, message: &str) {
        info!(host = %source, "{message}");
    }

    fn report_error(&self, source: &str, message: &str) {
        error!(host = %source, "{message}");
    }
}

// ============================================================================
// Tests
// ============================================================================
