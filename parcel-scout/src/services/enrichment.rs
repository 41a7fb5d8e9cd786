//! Highway-distance enrichment coordinator
//!
//! Sends the candidate parcels to an [`EnrichmentBackend`], merges the returned records
//! into the full dataset by `parcelId`, re-ranks the displayed view (filtered or not)
//! with [`ranking::top_n`] and publishes dataset, ranking and status to the
//! [`CatalogState`] in one update.
//!
//! At most one request is in flight. A second call while one is outstanding returns
//! [`ScoutError::EnrichmentBusy`] without touching anything.

use crate::error::{ScoutError, ScoutResult};
use crate::models::EnrichmentResponse;
use crate::services::ranking;
use crate::state::{CatalogState, EnrichmentStatus};
use async_trait::async_trait;
use chrono::Utc;
use parcel_common::events::{CatalogEvent, EventBus};
use parcel_common::Parcel;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Advisory shown when coverage is partial or zero
pub const DEGRADED_ADVISORY: &str =
    "Highway data is incomplete; highway distance may show as N/A for some parcels";

/// Source of highway-distance data
#[async_trait]
pub trait EnrichmentBackend: Send + Sync {
    /// Enrich `parcels`; the response may list them in any order
    async fn enrich(&self, parcels: &[Parcel]) -> ScoutResult<EnrichmentResponse>;
}

/// Successful enrichment result
#[derive(Debug, Clone)]
pub struct EnrichmentOutcome {
    /// Records the backend returned
    pub enriched_count: usize,
    /// Set when coverage was degraded
    pub advisory: Option<String>,
    /// New displayed ranking
    pub ranking: Arc<Vec<Parcel>>,
}

/// Replace dataset entries whose `parcel_id` appears in `updates`
///
/// Order is preserved, untouched entries are cloned as-is, and ids missing from the
/// dataset are ignored. Applying the same updates twice gives the same result.
pub fn merge_by_id(dataset: &[Parcel], updates: &[Parcel]) -> Vec<Parcel> {
    let by_id: HashMap<&str, &Parcel> = updates
        .iter()
        .map(|p| (p.parcel_id.as_str(), p))
        .collect();

    dataset
        .iter()
        .map(|p| match by_id.get(p.parcel_id.as_str()) {
            Some(updated) => (*updated).clone(),
            None => p.clone(),
        })
        .collect()
}

/// Releases the in-flight flag on every exit path
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Shows `Enriching` while held; restores the prior status unless settled
struct EnrichingStatus<'a> {
    state: &'a CatalogState,
    previous: Option<EnrichmentStatus>,
}

impl<'a> EnrichingStatus<'a> {
    fn begin(state: &'a CatalogState) -> Self {
        let previous = state.enrichment_status();
        state.set_enrichment_status(EnrichmentStatus::Enriching);
        Self {
            state,
            previous: Some(previous),
        }
    }

    /// The caller publishes the final status itself
    fn settle(mut self) {
        self.previous = None;
    }
}

impl Drop for EnrichingStatus<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.state.set_enrichment_status(previous);
        }
    }
}

/// Enrichment coordinator
pub struct EnrichmentCoordinator<B> {
    backend: B,
    event_bus: EventBus,
    top_n: usize,
    in_flight: AtomicBool,
}

impl<B: EnrichmentBackend> EnrichmentCoordinator<B> {
    /// Create new coordinator
    ///
    /// # Arguments
    /// * `backend` - Enrichment endpoint
    /// * `event_bus` - Event bus for enrichment events
    /// * `top_n` - Ranking size published after a merge
    pub fn new(backend: B, event_bus: EventBus, top_n: usize) -> Self {
        Self {
            backend,
            event_bus,
            top_n,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// A request is outstanding (the trigger is disabled)
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Enrich `candidates`, merge into the current dataset and publish the new ranking
    ///
    /// The merge applies to the full dataset, while the ranking is drawn from the
    /// displayed view so an active filter stays in effect.
    ///
    /// On failure the displayed ranking and dataset are left exactly as they were and
    /// the status becomes [`EnrichmentStatus::Failed`]. Dropping the future mid-request
    /// restores the status held before the call.
    pub async fn enrich(
        &self,
        state: &CatalogState,
        candidates: &[Parcel],
    ) -> ScoutResult<EnrichmentOutcome> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(ScoutError::EnrichmentBusy)?;

        info!(candidates = candidates.len(), "Starting highway-distance enrichment");
        let status = EnrichingStatus::begin(state);
        self.event_bus.emit_lossy(CatalogEvent::EnrichmentStarted {
            candidate_count: candidates.len(),
            timestamp: Utc::now(),
        });

        let response = match self.backend.enrich(candidates).await {
            Ok(response) => match response.error.clone() {
                Some(error) => Err(ScoutError::Backend(error)),
                None => Ok(response),
            },
            Err(e) => Err(e),
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Enrichment failed, keeping previous ranking");
                status.settle();
                state.set_enrichment_status(EnrichmentStatus::Failed {
                    error: e.to_string(),
                });
                self.event_bus.emit_lossy(CatalogEvent::EnrichmentFailed {
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(e);
            }
        };

        let enriched_count = response.parcels.len();
        let advisory = advisory_for(&response, candidates.len());
        if let Some(notice) = &advisory {
            warn!(
                enriched = enriched_count,
                requested = candidates.len(),
                advisory = %notice,
                "Enrichment coverage degraded"
            );
        }

        let current = state.dataset();
        let displayed = state.displayed();
        let (dataset, view) = if response.parcels.is_empty() {
            (current, displayed)
        } else {
            (
                Arc::new(merge_by_id(&current, &response.parcels)),
                Arc::new(merge_by_id(&displayed, &response.parcels)),
            )
        };
        let ranking = Arc::new(ranking::top_n(&view, self.top_n));

        status.settle();
        state.publish_enrichment(
            dataset,
            Arc::clone(&ranking),
            EnrichmentStatus::Enriched {
                enriched_count,
                advisory: advisory.clone(),
            },
        );

        info!(
            enriched = enriched_count,
            ranked = ranking.len(),
            "Enrichment merged and re-ranked"
        );
        self.event_bus.emit_lossy(CatalogEvent::EnrichmentCompleted {
            enriched_count,
            advisory: advisory.clone(),
            timestamp: Utc::now(),
        });

        Ok(EnrichmentOutcome {
            enriched_count,
            advisory,
            ranking,
        })
    }
}

/// Advisory text for a degraded response, `None` for full coverage
///
/// The backend's own warning wins over the generic notice.
fn advisory_for(response: &EnrichmentResponse, requested: usize) -> Option<String> {
    if let Some(warning) = response.warning.as_deref().filter(|w| !w.trim().is_empty()) {
        return Some(warning.to_string());
    }
    if response.reports_zero_coverage() || response.parcels.len() < requested {
        return Some(DEGRADED_ADVISORY.to_string());
    }
    None
}
