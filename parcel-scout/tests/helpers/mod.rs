//! Test helper modules for parcel-scout integration tests
//!
//! Provides reusable test infrastructure components:
//! - fixtures: parcel builders, NDJSON bodies and chunked byte streams
//! - TestBackend: throwaway axum server standing in for the parcel backend

#![allow(dead_code, unused_imports)]

pub mod fixtures;
pub mod test_backend;

// Re-export commonly used types
pub use fixtures::{chunk_stream, chunks_of, industrial, ndjson, scored, ChunkResult};
pub use test_backend::{EnrichmentReply, TestBackend};
