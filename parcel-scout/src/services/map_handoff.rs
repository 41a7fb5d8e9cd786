//! Map handoff
//!
//! Turns the displayed parcels into plot-ready markers. Parcels without valid
//! coordinates (see [`Parcel::coordinates`]) are skipped and counted.

use parcel_common::format::{format_number, format_text};
use parcel_common::Parcel;
use serde::Serialize;

/// One plottable parcel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub parcel_id: String,
    pub lat: f64,
    pub lon: f64,
    pub owner: Option<String>,
    pub address: Option<String>,
    pub zoning_fit_score: Option<f64>,
    pub investment_score: Option<f64>,
    /// Popup text: owner, address and both scores
    pub popup: String,
}

impl MapMarker {
    /// Marker for `parcel`, or `None` when it has no plottable coordinates
    pub fn from_parcel(parcel: &Parcel) -> Option<Self> {
        let (lat, lon) = parcel.coordinates()?;
        Some(Self {
            parcel_id: parcel.parcel_id.clone(),
            lat,
            lon,
            owner: parcel.owner.clone(),
            address: parcel.address.clone(),
            zoning_fit_score: parcel.zoning_fit_score,
            investment_score: parcel.investment_score,
            popup: popup_text(parcel),
        })
    }
}

fn popup_text(parcel: &Parcel) -> String {
    format!(
        "{}\n{}\nZoning fit: {}  Investment: {}",
        format_text(parcel.owner.as_deref()),
        format_text(parcel.address.as_deref()),
        format_number(parcel.zoning_fit_score),
        format_number(parcel.investment_score),
    )
}

/// Initial map position
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapCenter {
    pub lat: f64,
    pub lon: f64,
}

/// Markers plus the number of parcels left off the map
#[derive(Debug, Clone, Default, Serialize)]
pub struct MapHandoff {
    /// Mean marker position; `None` when nothing is plottable
    pub center: Option<MapCenter>,
    pub markers: Vec<MapMarker>,
    pub skipped: usize,
}

fn mean_position(markers: &[MapMarker]) -> Option<MapCenter> {
    if markers.is_empty() {
        return None;
    }
    let n = markers.len() as f64;
    let (lat, lon) = markers
        .iter()
        .fold((0.0, 0.0), |(lat, lon), m| (lat + m.lat, lon + m.lon));
    Some(MapCenter {
        lat: lat / n,
        lon: lon / n,
    })
}

/// Build markers for `parcels`, preserving order
pub fn markers(parcels: &[Parcel]) -> MapHandoff {
    let markers: Vec<MapMarker> = parcels.iter().filter_map(MapMarker::from_parcel).collect();
    let skipped = parcels.len() - markers.len();
    if skipped > 0 {
        tracing::debug!(skipped, plotted = markers.len(), "Parcels without coordinates left off map");
    }
    MapHandoff {
        center: mean_position(&markers),
        markers,
        skipped,
    }
}
