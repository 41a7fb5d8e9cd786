//! Error types for parcel-scout
//!
//! Malformed stream lines are not errors at this level: the stream parser counts
//! and logs them (see [`crate::services::stream_parser::ParseError`]). Everything
//! here halts the operation that raised it but never discards published data.

use thiserror::Error;

/// Pipeline error type
#[derive(Debug, Error)]
pub enum ScoutError {
    /// Connection, status or mid-stream read failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Backend answered with an explicit `error` field
    #[error("Backend error: {0}")]
    Backend(String),

    /// An enrichment request is already outstanding
    #[error("Enrichment already in progress")]
    EnrichmentBusy,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// parcel-common error
    #[error("Common error: {0}")]
    Common(#[from] parcel_common::Error),
}

/// Result type for pipeline operations
pub type ScoutResult<T> = Result<T, ScoutError>;
