//! Service modules for the parcel catalog pipeline
//!
//! Stream parsing and ingestion feed the dataset; ranking is pure; enrichment talks
//! to the backend through [`EnrichmentBackend`]; export and map handoff consume
//! whatever subset is displayed.

pub mod enrichment;
pub mod export;
pub mod ingestion;
pub mod map_handoff;
pub mod parcel_client;
pub mod ranking;
pub mod stream_parser;

pub use enrichment::{merge_by_id, EnrichmentBackend, EnrichmentCoordinator, EnrichmentOutcome};
pub use ingestion::IngestionController;
pub use map_handoff::{markers, MapCenter, MapHandoff, MapMarker};
pub use parcel_client::{Availability, ParcelApiClient};
pub use stream_parser::{parse_stream, LineBuffer, ParseError, ParseStats, StreamItem};
