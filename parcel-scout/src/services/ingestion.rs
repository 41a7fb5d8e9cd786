//! Streaming ingestion controller
//!
//! Drives [`parse_stream`] over an open byte stream, accumulates parcels in arrival
//! order and publishes throttled snapshots to the [`CatalogState`].
//!
//! # State Progression
//! IDLE → STREAMING → SETTLING → READY, or STREAMING → FAILED
//!
//! - **STREAMING**: a snapshot (dataset + displayed = dataset) goes out every
//!   `publish_every` records with progress `min(95, floor(count / expected * 100))`.
//! - **SETTLING**: stream closed; the final dataset is published at 100% and the
//!   controller waits `settle_delay` so a progress bar can visibly finish.
//! - **READY**: loading indicator off.
//! - **FAILED**: transport error; partial dataset published, loading off at once.
//!
//! Cancelling the token abandons the loop. Nothing is written to the state after
//! the cancellation is observed.

use crate::models::{IngestSession, IngestState};
use crate::services::parcel_client::ParcelApiClient;
use crate::services::stream_parser::{parse_stream, ParseStats, StreamItem};
use crate::state::CatalogState;
use chrono::Utc;
use futures::{Stream, StreamExt};
use parcel_common::config::IngestConfig;
use parcel_common::events::{CatalogEvent, EventBus};
use parcel_common::Parcel;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Ingestion controller service
pub struct IngestionController {
    config: IngestConfig,
    event_bus: EventBus,
}

impl IngestionController {
    /// Create new controller
    ///
    /// # Arguments
    /// * `config` - Expected total, publish cadence and settle delay
    /// * `event_bus` - Event bus for lifecycle and progress events
    pub fn new(config: IngestConfig, event_bus: EventBus) -> Self {
        Self { config, event_bus }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Open the county stream through `client` and ingest it
    ///
    /// A failure to open the stream ends the session in FAILED with an empty dataset.
    pub async fn ingest_county(
        &self,
        client: &ParcelApiClient,
        county: &str,
        state: &CatalogState,
        cancel: &CancellationToken,
    ) -> IngestSession {
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let mut session = IngestSession::new(county);
                session.transition_to(IngestState::Cancelled);
                info!(county = %county, "Ingestion cancelled before stream opened");
                return session;
            }
            opened = client.open_parcel_stream(county) => opened,
        };

        match opened {
            Ok(stream) => self.run(county, stream, state, cancel).await,
            Err(e) => {
                let mut session = IngestSession::new(county);
                state.begin_ingest();
                self.emit_started(&session);
                self.fail(&mut session, Vec::new(), state, e.to_string());
                session
            }
        }
    }

    /// Ingest an already-open chunked byte stream
    pub async fn run<S, B, E>(
        &self,
        source_label: &str,
        source: S,
        state: &CatalogState,
        cancel: &CancellationToken,
    ) -> IngestSession
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: fmt::Display,
    {
        let mut session = IngestSession::new(source_label);

        if cancel.is_cancelled() {
            session.transition_to(IngestState::Cancelled);
            return session;
        }

        info!(
            session_id = %session.session_id,
            source = %session.source,
            expected_total = self.config.expected_total,
            "Starting parcel ingestion"
        );

        session.transition_to(IngestState::Streaming);
        state.begin_ingest();
        self.emit_started(&session);

        let records = parse_stream(source);
        futures::pin_mut!(records);

        let publish_every = self.config.publish_every.max(1);
        let mut parcels: Vec<Parcel> = Vec::new();

        loop {
            let item = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return self.cancelled(session);
                }
                item = records.next() => item,
            };

            match item {
                Some(Ok(StreamItem::Parcel(parcel))) => {
                    parcels.push(parcel);
                    session.record_count = parcels.len();
                    if parcels.len() % publish_every == 0 {
                        self.publish_snapshot(&mut session, &parcels, state);
                    }
                }
                Some(Ok(StreamItem::End(stats))) => {
                    record_parse_stats(&mut session, &stats);
                    break;
                }
                Some(Ok(StreamItem::Interrupted(stats))) => {
                    record_parse_stats(&mut session, &stats);
                }
                Some(Err(e)) => {
                    self.fail(&mut session, parcels, state, e.to_string());
                    return session;
                }
                None => break,
            }
        }

        self.complete(session, parcels, state, cancel).await
    }

    fn emit_started(&self, session: &IngestSession) {
        self.event_bus.emit_lossy(CatalogEvent::IngestStarted {
            session_id: session.session_id,
            source: session.source.clone(),
            timestamp: Utc::now(),
        });
    }

    /// Counter-gated snapshot: full dataset, displayed = dataset
    fn publish_snapshot(&self, session: &mut IngestSession, parcels: &[Parcel], state: &CatalogState) {
        let progress = session.progress(self.config.expected_total);
        state.publish_ingest(Arc::new(parcels.to_vec()), progress);
        session.snapshots_published += 1;

        debug!(
            session_id = %session.session_id,
            record_count = progress.record_count,
            percent = progress.percent,
            "Published ingestion snapshot"
        );

        self.event_bus.emit_lossy(CatalogEvent::IngestProgress {
            session_id: session.session_id,
            record_count: progress.record_count,
            percent: progress.percent,
            timestamp: Utc::now(),
        });
    }

    /// STREAMING → SETTLING → READY
    async fn complete(
        &self,
        mut session: IngestSession,
        parcels: Vec<Parcel>,
        state: &CatalogState,
        cancel: &CancellationToken,
    ) -> IngestSession {
        if cancel.is_cancelled() {
            return self.cancelled(session);
        }

        session.record_count = parcels.len();
        session.transition_to(IngestState::Settling);
        let progress = session.progress(self.config.expected_total);
        state.publish_ingest(Arc::new(parcels), progress);

        info!(
            session_id = %session.session_id,
            record_count = session.record_count,
            malformed_lines = session.malformed_lines,
            "Parcel stream complete"
        );

        self.event_bus.emit_lossy(CatalogEvent::IngestProgress {
            session_id: session.session_id,
            record_count: session.record_count,
            percent: progress.percent,
            timestamp: Utc::now(),
        });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return self.cancelled(session);
            }
            _ = tokio::time::sleep(self.config.settle_delay()) => {}
        }

        session.transition_to(IngestState::Ready);
        state.set_ingest_progress(session.progress(self.config.expected_total));

        self.event_bus.emit_lossy(CatalogEvent::IngestCompleted {
            session_id: session.session_id,
            record_count: session.record_count,
            malformed_lines: session.malformed_lines,
            timestamp: Utc::now(),
        });

        session
    }

    /// STREAMING → FAILED, partial dataset kept and published
    fn fail(
        &self,
        session: &mut IngestSession,
        parcels: Vec<Parcel>,
        state: &CatalogState,
        error: String,
    ) {
        warn!(
            session_id = %session.session_id,
            record_count = parcels.len(),
            error = %error,
            "Parcel ingestion failed, keeping partial results"
        );

        session.record_count = parcels.len();
        session.fail(error.clone());
        state.publish_ingest(
            Arc::new(parcels),
            session.progress(self.config.expected_total),
        );

        self.event_bus.emit_lossy(CatalogEvent::IngestFailed {
            session_id: session.session_id,
            record_count: session.record_count,
            error,
            timestamp: Utc::now(),
        });
    }

    /// Consumer went away; report only, state untouched
    fn cancelled(&self, mut session: IngestSession) -> IngestSession {
        info!(
            session_id = %session.session_id,
            record_count = session.record_count,
            "Ingestion cancelled"
        );
        session.transition_to(IngestState::Cancelled);
        session
    }
}

fn record_parse_stats(session: &mut IngestSession, stats: &ParseStats) {
    session.malformed_lines = stats.malformed_lines;
    if stats.malformed_lines > 0 {
        warn!(
            session_id = %session.session_id,
            malformed_lines = stats.malformed_lines,
            "Dropped malformed lines during ingestion"
        );
    }
}
