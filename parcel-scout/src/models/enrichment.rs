//! Highway-distance enrichment wire types
//!
//! Request: `{ "parcels": [Parcel, ...] }`
//! Response: `{ "parcels": [...], "warning"?: str, "error"?: str, "summary"?: {...} }`

use parcel_common::Parcel;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Enrichment request body
#[derive(Debug, Serialize)]
pub struct EnrichmentRequest<'a> {
    pub parcels: &'a [Parcel],
}

/// Enrichment response body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResponse {
    /// Updated parcels, same ids as requested, order not guaranteed
    #[serde(default)]
    pub parcels: Vec<Parcel>,

    /// Degraded-coverage notice from the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,

    /// Backend-reported failure; no merge happens when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<EnrichmentSummary>,
}

/// Coverage summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentSummary {
    /// Parcels the backend found highway data for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_highway_data: Option<u64>,

    /// Other counters the backend reports
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl EnrichmentResponse {
    /// Backend explicitly reported zero coverage
    pub fn reports_zero_coverage(&self) -> bool {
        self.summary
            .as_ref()
            .and_then(|s| s.with_highway_data)
            .is_some_and(|n| n == 0)
    }
}
