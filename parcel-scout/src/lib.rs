//! parcel-scout library interface
//!
//! Streaming ingestion, ranking, enrichment and export for per-county parcel
//! catalogs. The binary in `main.rs` drives these pieces from the command line;
//! integration tests drive them directly.

pub mod cli;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

pub use crate::error::{ScoutError, ScoutResult};
pub use crate::state::{CatalogState, CatalogView};
