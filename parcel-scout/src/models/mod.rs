//! Data models for parcel-scout
//!
//! - Ingestion session state machine and progress
//! - Enrichment wire types

pub mod enrichment;
pub mod ingest_session;

pub use enrichment::{EnrichmentRequest, EnrichmentResponse, EnrichmentSummary};
pub use ingest_session::{progress_percent, IngestProgress, IngestSession, IngestState, StateTransition};
