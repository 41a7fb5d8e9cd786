//! Parcel backend HTTP client
//!
//! Three endpoints under the configured base URL:
//! - `GET  /api/parcels/{county}`: chunked NDJSON catalog stream
//! - `GET  /api/parcels/{county}/status`: `{ "fileExists": bool }` availability probe
//! - `POST /api/parcels/highway-distance`: highway-distance enrichment
//!
//! The client carries a connect timeout only; the catalog stream may legitimately run
//! longer than any fixed budget. Probe and enrichment requests get the configured
//! request timeout each.

use crate::error::{ScoutError, ScoutResult};
use crate::models::{EnrichmentRequest, EnrichmentResponse};
use crate::services::enrichment::EnrichmentBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use parcel_common::config::TomlConfig;
use parcel_common::Parcel;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const USER_AGENT: &str = concat!("parcel-scout/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Result of the availability probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Backend has a catalog file for the county
    Available,
    /// Backend answered and has no file
    Missing,
    /// Probe failed; says nothing about the county
    Unknown,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Availability::Available => "available",
            Availability::Missing => "missing",
            Availability::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    file_exists: bool,
}

/// Parcel backend client
#[derive(Debug, Clone)]
pub struct ParcelApiClient {
    http_client: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
}

impl ParcelApiClient {
    /// Create a client for `base_url`
    pub fn new(base_url: &str, request_timeout: Duration) -> ScoutResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            parcel_common::Error::Config(format!("Invalid backend URL {:?}: {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(parcel_common::Error::Config(format!(
                "Backend URL {} cannot carry a path",
                base_url
            ))
            .into());
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ScoutError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            request_timeout,
        })
    }

    /// Create a client from resolved configuration
    pub fn from_config(config: &TomlConfig) -> ScoutResult<Self> {
        Self::new(&config.backend_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/api/parcels/{segments...}`, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "parcels"]).extend(segments);
        }
        url
    }

    /// Open the county catalog stream
    ///
    /// Fails when the connection cannot be made or the status is not a success.
    /// Errors after this point arrive as items of the returned stream.
    pub async fn open_parcel_stream(
        &self,
        county: &str,
    ) -> ScoutResult<impl Stream<Item = Result<Bytes, reqwest::Error>>> {
        let url = self.endpoint(&[county]);
        tracing::debug!(url = %url, "Opening parcel stream");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ScoutError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ScoutError::Transport(format!(
                "HTTP {} opening parcel stream for {}: {}",
                status.as_u16(),
                county,
                error_text.trim()
            )));
        }

        Ok(response.bytes_stream())
    }

    /// Probe whether the backend holds a catalog for `county`
    ///
    /// Never fails: any transport, status or decode problem is `Unknown`.
    pub async fn check_availability(&self, county: &str) -> Availability {
        match self.fetch_status(county).await {
            Ok(true) => Availability::Available,
            Ok(false) => Availability::Missing,
            Err(e) => {
                tracing::debug!(county = %county, error = %e, "Availability probe failed");
                Availability::Unknown
            }
        }
    }

    async fn fetch_status(&self, county: &str) -> ScoutResult<bool> {
        let response = self
            .http_client
            .get(self.endpoint(&[county, "status"]))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| ScoutError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoutError::Transport(format!("HTTP {}", status.as_u16())));
        }

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|e| ScoutError::Decode(e.to_string()))?;
        Ok(body.file_exists)
    }
}

#[async_trait]
impl EnrichmentBackend for ParcelApiClient {
    async fn enrich(&self, parcels: &[Parcel]) -> ScoutResult<EnrichmentResponse> {
        tracing::debug!(candidates = parcels.len(), "Requesting highway-distance enrichment");

        let response = self
            .http_client
            .post(self.endpoint(&["highway-distance"]))
            .timeout(self.request_timeout)
            .json(&EnrichmentRequest { parcels })
            .send()
            .await
            .map_err(|e| ScoutError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            // Backend error bodies carry the same `error` field as a 200 response
            if let Ok(EnrichmentResponse {
                error: Some(error), ..
            }) = serde_json::from_str::<EnrichmentResponse>(&error_text)
            {
                return Err(ScoutError::Backend(error));
            }
            return Err(ScoutError::Transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_text.trim()
            )));
        }

        response
            .json::<EnrichmentResponse>()
            .await
            .map_err(|e| ScoutError::Decode(e.to_string()))
    }
}
