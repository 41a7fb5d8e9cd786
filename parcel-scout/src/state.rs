//! Catalog view state
//!
//! [`CatalogState`] is the single holder of what a front end shows: the full
//! dataset, the displayed subset, ingestion progress and enrichment status.
//! Components receive it by reference and publish whole new `Arc`s; readers
//! holding an older `Arc` never observe a mutation.

use crate::models::{IngestProgress, IngestState};
use crate::services::ranking;
use parcel_common::{FilterCriteria, Parcel};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Enrichment status shown next to the Top-N action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnrichmentStatus {
    /// No enrichment requested
    Idle,
    /// Request outstanding; the trigger is disabled
    Enriching,
    /// Merged and re-ranked
    Enriched {
        enriched_count: usize,
        advisory: Option<String>,
    },
    /// Request failed; the previous ranking is still displayed
    Failed { error: String },
}

/// Everything a consumer renders
#[derive(Debug, Clone)]
pub struct CatalogView {
    /// Full dataset in arrival order
    pub dataset: Arc<Vec<Parcel>>,
    /// Currently displayed subset (filtered, high-potential or ranked)
    pub displayed: Arc<Vec<Parcel>>,
    pub ingest: IngestProgress,
    pub enrichment: EnrichmentStatus,
}

impl Default for CatalogView {
    fn default() -> Self {
        Self {
            dataset: Arc::new(Vec::new()),
            displayed: Arc::new(Vec::new()),
            ingest: IngestProgress::default(),
            enrichment: EnrichmentStatus::Idle,
        }
    }
}

/// Shared view-state holder backed by a `watch` channel
pub struct CatalogState {
    tx: watch::Sender<CatalogView>,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogState {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(CatalogView::default());
        Self { tx }
    }

    /// Receive every future view change
    pub fn subscribe(&self) -> watch::Receiver<CatalogView> {
        self.tx.subscribe()
    }

    /// Current view (cheap: clones `Arc`s)
    pub fn view(&self) -> CatalogView {
        self.tx.borrow().clone()
    }

    pub fn dataset(&self) -> Arc<Vec<Parcel>> {
        Arc::clone(&self.tx.borrow().dataset)
    }

    pub fn displayed(&self) -> Arc<Vec<Parcel>> {
        Arc::clone(&self.tx.borrow().displayed)
    }

    pub fn ingest_progress(&self) -> IngestProgress {
        self.tx.borrow().ingest
    }

    pub fn enrichment_status(&self) -> EnrichmentStatus {
        self.tx.borrow().enrichment.clone()
    }

    /// Ingestion snapshot: the displayed view is the full dataset
    pub(crate) fn publish_ingest(&self, dataset: Arc<Vec<Parcel>>, progress: IngestProgress) {
        self.tx.send_modify(|view| {
            view.displayed = Arc::clone(&dataset);
            view.dataset = dataset;
            view.ingest = progress;
        });
    }

    /// Progress-only update (state change without new records)
    pub(crate) fn set_ingest_progress(&self, progress: IngestProgress) {
        self.tx.send_modify(|view| view.ingest = progress);
    }

    /// Reset to an empty catalog in STREAMING before a new load
    pub(crate) fn begin_ingest(&self) {
        self.tx.send_modify(|view| {
            view.dataset = Arc::new(Vec::new());
            view.displayed = Arc::new(Vec::new());
            view.ingest = IngestProgress {
                state: IngestState::Streaming,
                record_count: 0,
                percent: 0,
            };
            view.enrichment = EnrichmentStatus::Idle;
        });
    }

    pub(crate) fn set_enrichment_status(&self, status: EnrichmentStatus) {
        self.tx.send_modify(|view| view.enrichment = status);
    }

    /// Enrichment result: merged dataset, new ranking and status in one update
    pub(crate) fn publish_enrichment(
        &self,
        dataset: Arc<Vec<Parcel>>,
        ranking: Arc<Vec<Parcel>>,
        status: EnrichmentStatus,
    ) {
        self.tx.send_modify(|view| {
            view.dataset = dataset;
            view.displayed = ranking;
            view.enrichment = status;
        });
    }

    /// Replace the displayed subset
    pub fn set_displayed(&self, displayed: Arc<Vec<Parcel>>) {
        self.tx.send_modify(|view| view.displayed = displayed);
    }

    /// Display the dataset filtered by `criteria` and return that subset
    pub fn apply_filter(&self, criteria: &FilterCriteria) -> Arc<Vec<Parcel>> {
        let filtered = Arc::new(ranking::filter(&self.dataset(), criteria));
        self.set_displayed(Arc::clone(&filtered));
        filtered
    }

    /// Display the full dataset again
    pub fn reset_filter(&self) -> Arc<Vec<Parcel>> {
        let dataset = self.dataset();
        self.set_displayed(Arc::clone(&dataset));
        dataset
    }
}
