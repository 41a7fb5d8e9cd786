//! Event types for the parcel catalog pipeline
//!
//! Provides the shared event definitions and the broadcast [`EventBus`] used by the
//! ingestion controller and the enrichment coordinator to report lifecycle changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Catalog pipeline events
///
/// Events are broadcast via [`EventBus`] and serialize with a `type` tag so a
/// front end can forward them unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CatalogEvent {
    /// Ingestion stream opened
    IngestStarted {
        session_id: Uuid,
        /// County or source label being loaded
        source: String,
        timestamp: DateTime<Utc>,
    },

    /// Throttled progress update, emitted with every published snapshot
    IngestProgress {
        session_id: Uuid,
        record_count: usize,
        /// 0-95 while streaming, 100 once the stream has closed
        percent: u8,
        timestamp: DateTime<Utc>,
    },

    /// Stream closed cleanly and the final dataset was published
    IngestCompleted {
        session_id: Uuid,
        record_count: usize,
        malformed_lines: usize,
        timestamp: DateTime<Utc>,
    },

    /// Transport failure; partial data remains published
    IngestFailed {
        session_id: Uuid,
        record_count: usize,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Enrichment request sent
    EnrichmentStarted {
        candidate_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Enrichment merged and the ranking recomputed
    EnrichmentCompleted {
        enriched_count: usize,
        /// Advisory text when coverage was partial
        advisory: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Enrichment failed; previous ranking left in place
    EnrichmentFailed {
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl CatalogEvent {
    /// Short event name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::IngestStarted { .. } => "IngestStarted",
            CatalogEvent::IngestProgress { .. } => "IngestProgress",
            CatalogEvent::IngestCompleted { .. } => "IngestCompleted",
            CatalogEvent::IngestFailed { .. } => "IngestFailed",
            CatalogEvent::EnrichmentStarted { .. } => "EnrichmentStarted",
            CatalogEvent::EnrichmentCompleted { .. } => "EnrichmentCompleted",
            CatalogEvent::EnrichmentFailed { .. } => "EnrichmentFailed",
        }
    }
}

/// Broadcast bus for [`CatalogEvent`]s
///
/// Cloning is cheap; all clones share one channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CatalogEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before slow subscribers start lagging
    ///
    /// # Examples
    ///
    /// ```
    /// use parcel_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CatalogEvent,
    ) -> Result<usize, broadcast::error::SendError<CatalogEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    ///
    /// Use for progress-style events where nobody listening is normal.
    pub fn emit_lossy(&self, event: CatalogEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
