//! Parcel data model
//!
//! One [`Parcel`] is decoded from each line of the ingestion stream. Field names on the
//! wire are camelCase (`parcelId`, `zoningFitScore`, ...) except for the few snake_case
//! keys the backend has always emitted (`zoning_desc`, `gps_lat`, `gps_lon`).
//!
//! Decoding is lenient per field: a value of the wrong shape becomes `None` instead of
//! failing the whole record. Only a missing or non-textual `parcelId` rejects a line.
//! Keys the model does not name are kept in [`Parcel::extra`] so they survive enrichment
//! round trips and show up in exports.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Zoning codes ranked ahead of everything else by highway proximity
pub const INDUSTRIAL_ZONES: [&str; 3] = ["HI", "LI", "M-1"];

/// Real-estate parcel record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parcel {
    /// Stable identifier, join key for enrichment merges
    pub parcel_id: String,

    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Lot size in acres
    #[serde(default, deserialize_with = "lenient::real", skip_serializing_if = "Option::is_none")]
    pub acreage: Option<f64>,

    /// Zoning code ("HI", "LI", "M-1", "R1", ...)
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub zoning: Option<String>,

    /// Zoning fit score, nominally 0-5
    #[serde(default, deserialize_with = "lenient::real", skip_serializing_if = "Option::is_none")]
    pub zoning_fit_score: Option<f64>,

    /// Investment score, nominally 0-5
    #[serde(default, deserialize_with = "lenient::real", skip_serializing_if = "Option::is_none")]
    pub investment_score: Option<f64>,

    #[serde(default, deserialize_with = "lenient::real", skip_serializing_if = "Option::is_none")]
    pub assessed_value: Option<f64>,

    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub owner_type: Option<String>,

    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub years_owned: Option<u32>,

    #[serde(default, deserialize_with = "lenient::flag", skip_serializing_if = "Option::is_none")]
    pub out_of_state: Option<bool>,

    #[serde(
        rename = "zoning_desc",
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub zoning_desc: Option<String>,

    /// Nested coordinates (`gps: {lat, lon}`)
    #[serde(default, deserialize_with = "lenient::record", skip_serializing_if = "Option::is_none")]
    pub gps: Option<Gps>,

    /// Flat latitude, used when `gps.lat` is absent
    #[serde(
        rename = "gps_lat",
        default,
        deserialize_with = "lenient::real",
        skip_serializing_if = "Option::is_none"
    )]
    pub gps_lat: Option<f64>,

    /// Flat longitude, used when `gps.lon` is absent
    #[serde(
        rename = "gps_lon",
        default,
        deserialize_with = "lenient::real",
        skip_serializing_if = "Option::is_none"
    )]
    pub gps_lon: Option<f64>,

    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,

    /// Attached by the highway-distance enrichment
    #[serde(default, deserialize_with = "lenient::record", skip_serializing_if = "Option::is_none")]
    pub highway_distance: Option<HighwayDistance>,

    /// Attached by the highway-distance enrichment
    #[serde(default, deserialize_with = "lenient::real", skip_serializing_if = "Option::is_none")]
    pub highway_distance_score: Option<f64>,

    /// Attributes the model does not name, preserved verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Nested coordinate pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gps {
    #[serde(default, deserialize_with = "lenient::real", skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient::real", skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

/// Highway proximity sub-record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighwayDistance {
    #[serde(default, deserialize_with = "lenient::real", skip_serializing_if = "Option::is_none")]
    pub distance_miles: Option<f64>,
}

impl HighwayDistance {
    pub fn miles(distance_miles: f64) -> Self {
        Self {
            distance_miles: Some(distance_miles),
        }
    }
}

impl Parcel {
    /// Create a parcel carrying only its identifier
    pub fn new(parcel_id: impl Into<String>) -> Self {
        Self {
            parcel_id: parcel_id.into(),
            owner: None,
            address: None,
            acreage: None,
            zoning: None,
            zoning_fit_score: None,
            investment_score: None,
            assessed_value: None,
            owner_type: None,
            years_owned: None,
            out_of_state: None,
            zoning_desc: None,
            gps: None,
            gps_lat: None,
            gps_lon: None,
            contact_info: None,
            highway_distance: None,
            highway_distance_score: None,
            extra: BTreeMap::new(),
        }
    }

    /// Decode one NDJSON line
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Zoning is one of [`INDUSTRIAL_ZONES`] (exact code match)
    pub fn is_industrial(&self) -> bool {
        self.zoning
            .as_deref()
            .is_some_and(|z| INDUSTRIAL_ZONES.contains(&z))
    }

    /// Highway distance in miles, if enrichment supplied one
    pub fn distance_miles(&self) -> Option<f64> {
        self.highway_distance.as_ref().and_then(|h| h.distance_miles)
    }

    /// Investment score with a missing value read as 0
    pub fn investment_or_zero(&self) -> f64 {
        self.investment_score.unwrap_or(0.0)
    }

    /// Zoning fit score with a missing value read as 0
    pub fn zoning_fit_or_zero(&self) -> f64 {
        self.zoning_fit_score.unwrap_or(0.0)
    }

    pub fn latitude(&self) -> Option<f64> {
        self.gps.as_ref().and_then(|g| g.lat).or(self.gps_lat)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.gps.as_ref().and_then(|g| g.lon).or(self.gps_lon)
    }

    /// Plot-ready `(lat, lon)`
    ///
    /// Zero is rejected along with out-of-range values; the backend writes 0 for
    /// "unknown" and such parcels have never been plotted.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.latitude()?;
        let lon = self.longitude()?;
        let valid_lat = lat.is_finite() && lat != 0.0 && (-90.0..=90.0).contains(&lat);
        let valid_lon = lon.is_finite() && lon != 0.0 && (-180.0..=180.0).contains(&lon);
        (valid_lat && valid_lon).then_some((lat, lon))
    }
}

/// Numeric bounds applied by the catalog filter
///
/// `None` means unbounded on that side. Zero is a real bound, not "unset".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub min_zoning_score: Option<f64>,
    pub max_zoning_score: Option<f64>,
    pub min_acreage: Option<f64>,
    pub max_acreage: Option<f64>,
}

impl FilterCriteria {
    /// Build criteria from raw text inputs where an empty field means "unset"
    pub fn from_inputs(
        min_zoning_score: &str,
        max_zoning_score: &str,
        min_acreage: &str,
        max_acreage: &str,
    ) -> Result<Self> {
        Ok(Self {
            min_zoning_score: parse_bound("min zoning score", min_zoning_score)?,
            max_zoning_score: parse_bound("max zoning score", max_zoning_score)?,
            min_acreage: parse_bound("min acreage", min_acreage)?,
            max_acreage: parse_bound("max acreage", max_acreage)?,
        })
    }

    /// No bound is set
    pub fn is_unbounded(&self) -> bool {
        self.min_zoning_score.is_none()
            && self.max_zoning_score.is_none()
            && self.min_acreage.is_none()
            && self.max_acreage.is_none()
    }
}

fn parse_bound(label: &str, input: &str) -> Result<Option<f64>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(Error::InvalidInput(format!(
            "{} must be a number, got {:?}",
            label, input
        ))),
    }
}

/// Field-level decoders that turn malformed values into `None`
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    pub fn real<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value.as_ref().and_then(number))
    }

    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value
            .as_ref()
            .and_then(number)
            .filter(|v| *v >= 0.0 && v.fract() == 0.0 && *v <= f64::from(u32::MAX))
            .map(|v| v as u32))
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        })
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Some(true),
                "false" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    pub fn record<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value.and_then(|v| match v {
            Value::Object(_) => serde_json::from_value(v).ok(),
            _ => None,
        }))
    }
}
