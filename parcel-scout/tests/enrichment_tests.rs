//! Enrichment coordinator tests
//!
//! Drive the coordinator against in-process backends; HTTP coverage lives in
//! http_client_tests.rs.

mod helpers;

use async_trait::async_trait;
use helpers::{chunk_stream, chunks_of, industrial, ndjson, scored};
use parcel_common::config::IngestConfig;
use parcel_common::events::{CatalogEvent, EventBus};
use parcel_common::{FilterCriteria, HighwayDistance, Parcel};
use parcel_scout::models::{EnrichmentResponse, EnrichmentSummary};
use parcel_scout::services::enrichment::DEGRADED_ADVISORY;
use parcel_scout::services::ranking::initial_ranking;
use parcel_scout::services::{
    merge_by_id, EnrichmentBackend, EnrichmentCoordinator, IngestionController,
};
use parcel_scout::state::EnrichmentStatus;
use parcel_scout::{CatalogState, ScoutError, ScoutResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;

/// Answers with distances from a fixed table, optionally degraded
struct TableBackend {
    miles: HashMap<String, f64>,
    warning: Option<String>,
    with_highway_data: Option<u64>,
}

impl TableBackend {
    fn new(pairs: &[(&str, f64)]) -> Self {
        Self {
            miles: pairs.iter().map(|(id, m)| (id.to_string(), *m)).collect(),
            warning: None,
            with_highway_data: None,
        }
    }
}

#[async_trait]
impl EnrichmentBackend for TableBackend {
    async fn enrich(&self, parcels: &[Parcel]) -> ScoutResult<EnrichmentResponse> {
        let parcels = parcels
            .iter()
            .filter_map(|p| {
                let miles = *self.miles.get(&p.parcel_id)?;
                Some(Parcel {
                    highway_distance: Some(HighwayDistance::miles(miles)),
                    highway_distance_score: Some(5.0 - miles),
                    ..p.clone()
                })
            })
            .collect();
        Ok(EnrichmentResponse {
            parcels,
            warning: self.warning.clone(),
            error: None,
            summary: self.with_highway_data.map(|n| EnrichmentSummary {
                with_highway_data: Some(n),
                ..EnrichmentSummary::default()
            }),
        })
    }
}

/// Always fails the same way
struct FailingBackend(fn() -> ScoutResult<EnrichmentResponse>);

#[async_trait]
impl EnrichmentBackend for FailingBackend {
    async fn enrich(&self, _parcels: &[Parcel]) -> ScoutResult<EnrichmentResponse> {
        (self.0)()
    }
}

/// Holds the request open until released
struct GatedBackend {
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

#[async_trait]
impl EnrichmentBackend for GatedBackend {
    async fn enrich(&self, _parcels: &[Parcel]) -> ScoutResult<EnrichmentResponse> {
        let gate = self.gate.lock().await.take();
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        Ok(EnrichmentResponse::default())
    }
}

/// Catalog state holding `dataset`, loaded through a real ingestion run
async fn loaded_state(dataset: Vec<Parcel>) -> CatalogState {
    let state = CatalogState::new();
    let controller = IngestionController::new(
        IngestConfig {
            settle_delay_ms: 0,
            ..IngestConfig::default()
        },
        EventBus::new(16),
    );
    let body = ndjson(&dataset);
    controller
        .run("fixture", chunk_stream(chunks_of(body.as_bytes(), 256)), &state, &CancellationToken::new())
        .await;
    state
}

fn catalog() -> Vec<Parcel> {
    vec![
        industrial("HI-1", "HI", None),
        industrial("LI-1", "LI", None),
        scored("R-1", 4.8, 4.8),
        scored("R-2", 3.0, 2.0),
    ]
}

fn ids(parcels: &[Parcel]) -> Vec<&str> {
    parcels.iter().map(|p| p.parcel_id.as_str()).collect()
}

#[test]
fn tc_merge_is_idempotent() {
    let dataset = catalog();
    let updates = vec![Parcel {
        highway_distance: Some(HighwayDistance::miles(2.0)),
        ..dataset[1].clone()
    }];

    let once = merge_by_id(&dataset, &updates);
    let twice = merge_by_id(&once, &updates);

    assert_eq!(once, twice);
}

#[test]
fn tc_merge_never_touches_absent_ids() {
    let dataset = catalog();
    let updates = vec![Parcel {
        highway_distance: Some(HighwayDistance::miles(2.0)),
        ..dataset[0].clone()
    }];

    let merged = merge_by_id(&dataset, &updates);

    assert_eq!(merged[0].distance_miles(), Some(2.0));
    assert_eq!(&merged[1..], &dataset[1..]);
}

#[tokio::test]
async fn tc_enrichment_merges_and_reranks() {
    // Given: LI-1 turns out closer to the highway than HI-1
    let state = loaded_state(catalog()).await;
    let event_bus = EventBus::new(16);
    let mut events = event_bus.subscribe();
    let coordinator = EnrichmentCoordinator::new(
        TableBackend::new(&[("HI-1", 3.5), ("LI-1", 0.8)]),
        event_bus,
        50,
    );

    // When
    let candidates = vec![catalog()[0].clone(), catalog()[1].clone()];
    let outcome = coordinator.enrich(&state, &candidates).await.unwrap();

    // Then
    assert_eq!(outcome.enriched_count, 2);
    assert_eq!(outcome.advisory, None);
    assert_eq!(ids(&outcome.ranking), vec!["LI-1", "HI-1", "R-1", "R-2"]);
    assert_eq!(ids(&state.displayed()), ids(&outcome.ranking));
    assert_eq!(state.dataset()[1].distance_miles(), Some(0.8));
    // Dataset keeps arrival order
    assert_eq!(ids(&state.dataset()), vec!["HI-1", "LI-1", "R-1", "R-2"]);
    assert!(matches!(
        state.enrichment_status(),
        EnrichmentStatus::Enriched { enriched_count: 2, advisory: None }
    ));
    assert!(!coordinator.is_in_flight());

    assert!(matches!(events.try_recv(), Ok(CatalogEvent::EnrichmentStarted { candidate_count: 2, .. })));
    assert!(matches!(events.try_recv(), Ok(CatalogEvent::EnrichmentCompleted { enriched_count: 2, .. })));
}

#[tokio::test]
async fn tc_partial_coverage_yields_advisory() {
    // Given: only one of two candidates comes back
    let state = loaded_state(catalog()).await;
    let coordinator = EnrichmentCoordinator::new(
        TableBackend::new(&[("LI-1", 0.8)]),
        EventBus::new(16),
        50,
    );

    // When
    let candidates = catalog()[..2].to_vec();
    let outcome = coordinator.enrich(&state, &candidates).await.unwrap();

    // Then: merge applied, HI-1 without distance ranks after LI-1
    assert_eq!(outcome.advisory.as_deref(), Some(DEGRADED_ADVISORY));
    assert_eq!(ids(&outcome.ranking)[..2], ["LI-1", "HI-1"]);
    assert_eq!(state.dataset()[0].distance_miles(), None);
}

#[tokio::test]
async fn tc_zero_coverage_keeps_dataset_and_reports_advisory() {
    let state = loaded_state(catalog()).await;
    let before = state.dataset();
    let mut backend = TableBackend::new(&[]);
    backend.with_highway_data = Some(0);
    let coordinator = EnrichmentCoordinator::new(backend, EventBus::new(16), 3);

    let outcome = coordinator.enrich(&state, &catalog()[..2]).await.unwrap();

    assert_eq!(outcome.enriched_count, 0);
    assert!(outcome.advisory.is_some());
    assert!(Arc::ptr_eq(&state.dataset(), &before));
    assert_eq!(ids(&state.displayed()), vec!["HI-1", "LI-1", "R-1"]);
}

#[tokio::test]
async fn tc_backend_warning_is_surfaced_verbatim() {
    let state = loaded_state(catalog()).await;
    let mut backend = TableBackend::new(&[("HI-1", 1.0), ("LI-1", 2.0)]);
    backend.warning = Some("Highway layer is from 2019".to_string());
    let coordinator = EnrichmentCoordinator::new(backend, EventBus::new(16), 50);

    let outcome = coordinator.enrich(&state, &catalog()[..2]).await.unwrap();

    assert_eq!(outcome.advisory.as_deref(), Some("Highway layer is from 2019"));
}

#[tokio::test]
async fn tc_failure_keeps_previous_ranking() {
    // Given: a ranking is already displayed
    let state = loaded_state(catalog()).await;
    let shown = Arc::new(vec![catalog()[2].clone()]);
    state.set_displayed(Arc::clone(&shown));
    let dataset_before = state.dataset();
    let coordinator = EnrichmentCoordinator::new(
        FailingBackend(|| Err(ScoutError::Transport("connection refused".to_string()))),
        EventBus::new(16),
        50,
    );

    // When
    let result = coordinator.enrich(&state, &catalog()).await;

    // Then
    assert!(matches!(result, Err(ScoutError::Transport(_))));
    assert!(Arc::ptr_eq(&state.displayed(), &shown));
    assert!(Arc::ptr_eq(&state.dataset(), &dataset_before));
    assert!(matches!(state.enrichment_status(), EnrichmentStatus::Failed { .. }));
    assert!(!coordinator.is_in_flight());
}

#[tokio::test]
async fn tc_error_field_is_a_failure_without_merge() {
    let state = loaded_state(catalog()).await;
    let dataset_before = state.dataset();
    let coordinator = EnrichmentCoordinator::new(
        FailingBackend(|| {
            Ok(EnrichmentResponse {
                parcels: vec![Parcel {
                    highway_distance: Some(HighwayDistance::miles(1.0)),
                    ..Parcel::new("HI-1")
                }],
                error: Some("highway layer missing".to_string()),
                ..EnrichmentResponse::default()
            })
        }),
        EventBus::new(16),
        50,
    );

    let result = coordinator.enrich(&state, &catalog()).await;

    assert!(matches!(result, Err(ScoutError::Backend(msg)) if msg == "highway layer missing"));
    assert!(Arc::ptr_eq(&state.dataset(), &dataset_before));
}

#[tokio::test]
async fn tc_second_request_while_in_flight_is_busy() {
    // Given: the first request is parked inside the backend
    let (release, gate) = oneshot::channel();
    let coordinator = Arc::new(EnrichmentCoordinator::new(
        GatedBackend {
            gate: Mutex::new(Some(gate)),
        },
        EventBus::new(16),
        50,
    ));
    let state = Arc::new(loaded_state(catalog()).await);

    let first = {
        let coordinator = Arc::clone(&coordinator);
        let state = Arc::clone(&state);
        tokio::spawn(async move { coordinator.enrich(&state, &catalog()).await })
    };
    while !coordinator.is_in_flight() {
        tokio::task::yield_now().await;
    }
    assert_eq!(state.enrichment_status(), EnrichmentStatus::Enriching);

    // When
    let second = coordinator.enrich(&state, &catalog()).await;

    // Then
    assert!(matches!(second, Err(ScoutError::EnrichmentBusy)));
    release.send(()).unwrap();
    assert!(first.await.unwrap().is_ok());
    assert!(!coordinator.is_in_flight());

    // Trigger is usable again
    assert!(coordinator.enrich(&state, &catalog()).await.is_ok());
}

#[tokio::test]
async fn tc_enrichment_ranking_respects_active_filter() {
    // Given: a filter that hides SMALL despite its top scores
    let small = Parcel {
        acreage: Some(1.0),
        ..scored("SMALL", 5.0, 5.0)
    };
    let big = Parcel {
        acreage: Some(200.0),
        ..scored("BIG", 2.0, 2.0)
    };
    let state = loaded_state(vec![small, big]).await;
    let shown = state.apply_filter(&FilterCriteria {
        min_acreage: Some(100.0),
        ..FilterCriteria::default()
    });
    let coordinator = EnrichmentCoordinator::new(
        TableBackend::new(&[("BIG", 2.0)]),
        EventBus::new(16),
        50,
    );

    // When
    let candidates = initial_ranking(&shown, 50);
    let outcome = coordinator.enrich(&state, &candidates).await.unwrap();

    // Then: ranking stays within the filter, merge still reaches the full dataset
    assert_eq!(ids(&candidates), vec!["BIG"]);
    assert_eq!(ids(&outcome.ranking), vec!["BIG"]);
    assert_eq!(ids(&state.displayed()), vec!["BIG"]);
    assert_eq!(outcome.ranking[0].distance_miles(), Some(2.0));
    assert_eq!(ids(&state.dataset()), vec!["SMALL", "BIG"]);
    assert_eq!(state.dataset()[1].distance_miles(), Some(2.0));
}

#[tokio::test]
async fn tc_abandoned_request_restores_status() {
    // Given: a backend that never answers
    let (_hold, gate) = oneshot::channel::<()>();
    let coordinator = EnrichmentCoordinator::new(
        GatedBackend {
            gate: Mutex::new(Some(gate)),
        },
        EventBus::new(16),
        50,
    );
    let state = loaded_state(catalog()).await;
    let displayed_before = state.displayed();

    // When: the caller gives up mid-request
    let result = tokio::time::timeout(
        Duration::from_millis(20),
        coordinator.enrich(&state, &catalog()),
    )
    .await;

    // Then: trigger released and status back to what it was
    assert!(result.is_err());
    assert!(!coordinator.is_in_flight());
    assert_eq!(state.enrichment_status(), EnrichmentStatus::Idle);
    assert!(Arc::ptr_eq(&state.displayed(), &displayed_before));
}
