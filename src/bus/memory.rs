//! Sink that records every call in memory.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::Result;

use super::{BusSink, NormalizedMetadata, NormalizedUpdate};

/// One recorded sink call.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// An update batch.
    Updates {
        /// Board host.
        source: String,
        /// The batch.
        updates: Vec<NormalizedUpdate>,
    },
    /// A metadata batch.
    Metadata {
        /// Board host.
        source: String,
        /// The batch.
        metadata: Vec<NormalizedMetadata>,
    },
    /// A status line.
    Status {
        /// Board host.
        source: String,
        /// Text.
        message: String,
    },
    /// An error line.
    Error {
        /// Board host.
        source: String,
        /// Text.
        message: String,
    },
}

/// Records sink calls in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SinkEvent>>,
    notify: Notify,
}

impl MemorySink {
    /// Creates an empty sink.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    /// Every update across all batches, flattened.
    #[must_use]
    pub fn updates(&self) -> Vec<NormalizedUpdate> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Updates { updates, .. } => Some(updates.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Every metadata record across all batches, flattened.
    #[must_use]
    pub fn metadata(&self) -> Vec<NormalizedMetadata> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Metadata { metadata, .. } => Some(metadata.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Drops everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Waits until `predicate` holds over the recorded events.
    ///
    /// Returns `false` if it still does not hold after `limit`.
    pub async fn wait_for<F>(&self, limit: Duration, predicate: F) -> bool
    where
        F: Fn(&[SinkEvent]) -> bool,
    {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                if predicate(&self.events.lock()) {
                    return;
                }
                notified.await;
            }
        };

        tokio::time::timeout(limit, wait).await.is_ok()
    }

    fn record(&self, event: SinkEvent) {
        self.events.lock().push(event);
        self.notify.notify_waiters();
    }
}

impl BusSink for MemorySink {
    fn publish_updates(&self, source: &str, updates: &[NormalizedUpdate]) -> Result<()> {
        self.record(SinkEvent::Updates {
            source: source.to_string(),
            updates: updates.to_vec(),
        });
        Ok(())
    }

    fn publish_metadata(&self, source: &str, metadata: &[NormalizedMetadata]) -> Result<()> {
        self.record(SinkEvent::Metadata {
            source: source.to_string(),
            metadata: metadata.to_vec(),
        });
        Ok(())
    }

    fn report_status(&self, source: &str, message: &str) {
        self.record(SinkEvent::Status {
            source: source.to_string(),
            message: message.to_string(),
        });
    }

    fn report_error(&self, source: &str, message: &str) {
        self.record(SinkEvent::Error {
            source: source.to_string(),
            message: message.to_string(),
        });
    }
}
