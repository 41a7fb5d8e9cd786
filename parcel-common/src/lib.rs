//! # Parcel Scout Common Library
//!
//! Shared code for the parcel catalog pipeline including:
//! - Parcel data model and filter criteria
//! - Event types (CatalogEvent enum) and the EventBus
//! - Configuration loading and resolution
//! - Display formatting helpers

pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod parcel;

pub use error::{Error, Result};
pub use parcel::{FilterCriteria, Gps, HighwayDistance, Parcel};
