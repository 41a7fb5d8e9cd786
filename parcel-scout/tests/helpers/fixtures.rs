//! Parcel and byte-stream fixtures

use bytes::Bytes;
use futures::stream::{self, Stream};
use parcel_common::{HighwayDistance, Parcel};
use std::io;

/// Item type of the in-memory chunk streams
pub type ChunkResult = Result<Bytes, io::Error>;

/// Non-industrial parcel with both scores
pub fn scored(id: &str, investment: f64, zoning_fit: f64) -> Parcel {
    Parcel {
        zoning: Some("R1".to_string()),
        investment_score: Some(investment),
        zoning_fit_score: Some(zoning_fit),
        ..Parcel::new(id)
    }
}

/// Industrial parcel, optionally already carrying a highway distance
pub fn industrial(id: &str, zoning: &str, distance: Option<f64>) -> Parcel {
    Parcel {
        zoning: Some(zoning.to_string()),
        investment_score: Some(1.0),
        zoning_fit_score: Some(1.0),
        highway_distance: distance.map(HighwayDistance::miles),
        ..Parcel::new(id)
    }
}

/// One JSON object per line, each line newline-terminated
pub fn ndjson(parcels: &[Parcel]) -> String {
    parcels
        .iter()
        .map(|p| format!("{}\n", serde_json::to_string(p).unwrap()))
        .collect()
}

/// Split `body` into chunks of at most `size` bytes (may cut inside a character)
pub fn chunks_of(body: &[u8], size: usize) -> Vec<ChunkResult> {
    body.chunks(size.max(1))
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect()
}

pub fn chunk_stream(chunks: Vec<ChunkResult>) -> impl Stream<Item = ChunkResult> {
    stream::iter(chunks)
}

/// Chunk that fails the stream the way a dropped connection does
pub fn reset() -> ChunkResult {
    Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer"))
}

/// `count` sequential parcels `P-0000`, `P-0001`, ...
pub fn numbered(count: usize) -> Vec<Parcel> {
    (0..count)
        .map(|i| Parcel {
            acreage: Some(i as f64),
            ..Parcel::new(format!("P-{:04}", i))
        })
        .collect()
}
