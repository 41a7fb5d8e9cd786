//! Stand-in parcel backend for HTTP integration tests
//!
//! Serves the three backend endpoints from an axum router bound to
//! `127.0.0.1:0`. Catalog bodies go out as a chunked NDJSON stream, with a short
//! pause between chunks so the client sees them as separate reads.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const CHUNK_PAUSE: Duration = Duration::from_millis(5);

/// How the enrichment endpoint answers
#[derive(Debug, Clone)]
pub enum EnrichmentReply {
    /// Attach a distance to every requested parcel listed here; others are left out
    Distances {
        miles: HashMap<String, f64>,
        warning: Option<String>,
        with_highway_data: Option<u64>,
    },
    /// 200 carrying an `error` field
    ErrorField(String),
    /// Non-success status with a raw body
    Status(u16, String),
}

impl EnrichmentReply {
    pub fn distances(pairs: &[(&str, f64)]) -> Self {
        EnrichmentReply::Distances {
            miles: pairs.iter().map(|(id, m)| (id.to_string(), *m)).collect(),
            warning: None,
            with_highway_data: None,
        }
    }
}

struct Catalog {
    chunks: Vec<Bytes>,
    drop_connection: bool,
}

struct BackendState {
    catalogs: HashMap<String, Catalog>,
    broken_status: HashSet<String>,
    enrichment: EnrichmentReply,
    enrich_calls: AtomicUsize,
}

/// Builder for [`TestBackend`]
pub struct TestBackendBuilder {
    catalogs: HashMap<String, Catalog>,
    broken_status: HashSet<String>,
    enrichment: EnrichmentReply,
}

impl TestBackendBuilder {
    /// Serve `body` for `county` in chunks of `chunk_size` bytes
    pub fn catalog(mut self, county: &str, body: &str, chunk_size: usize) -> Self {
        self.catalogs.insert(county.to_string(), Catalog {
            chunks: split(body, chunk_size),
            drop_connection: false,
        });
        self
    }

    /// Serve `body` for `county`, then drop the connection without ending the body
    pub fn dropping_catalog(mut self, county: &str, body: &str, chunk_size: usize) -> Self {
        self.catalogs.insert(county.to_string(), Catalog {
            chunks: split(body, chunk_size),
            drop_connection: true,
        });
        self
    }

    /// Status endpoint answers 500 for `county`
    pub fn broken_status(mut self, county: &str) -> Self {
        self.broken_status.insert(county.to_string());
        self
    }

    pub fn enrichment(mut self, reply: EnrichmentReply) -> Self {
        self.enrichment = reply;
        self
    }

    pub async fn start(self) -> TestBackend {
        let state = Arc::new(BackendState {
            catalogs: self.catalogs,
            broken_status: self.broken_status,
            enrichment: self.enrichment,
            enrich_calls: AtomicUsize::new(0),
        });

        let router = Router::new()
            .route("/api/parcels/highway-distance", post(highway_distance))
            .route("/api/parcels/:county", get(parcel_stream))
            .route("/api/parcels/:county/status", get(county_status))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        TestBackend {
            base_url: format!("http://{}", addr),
            state,
            server,
        }
    }
}

/// Running stand-in backend; stops when dropped
pub struct TestBackend {
    pub base_url: String,
    state: Arc<BackendState>,
    server: JoinHandle<()>,
}

impl TestBackend {
    pub fn builder() -> TestBackendBuilder {
        TestBackendBuilder {
            catalogs: HashMap::new(),
            broken_status: HashSet::new(),
            enrichment: EnrichmentReply::distances(&[]),
        }
    }

    /// Enrichment requests received so far
    pub fn enrich_calls(&self) -> usize {
        self.state.enrich_calls.load(Ordering::SeqCst)
    }

    /// Base URL of a port nothing listens on
    pub async fn unreachable_url() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }
}

impl Drop for TestBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn split(body: &str, chunk_size: usize) -> Vec<Bytes> {
    body.as_bytes()
        .chunks(chunk_size.max(1))
        .map(Bytes::copy_from_slice)
        .collect()
}

async fn parcel_stream(
    State(state): State<Arc<BackendState>>,
    Path(county): Path<String>,
) -> Response {
    let Some(catalog) = state.catalogs.get(&county) else {
        return (StatusCode::NOT_FOUND, format!("no catalog for {}", county)).into_response();
    };

    let mut items: Vec<Result<Bytes, io::Error>> =
        catalog.chunks.iter().cloned().map(Ok).collect();
    if catalog.drop_connection {
        items.push(Err(io::Error::new(
            io::ErrorKind::ConnectionAborted,
            "backend dropped the stream",
        )));
    }

    let body = stream::iter(items).then(|item| async move {
        tokio::time::sleep(CHUNK_PAUSE).await;
        item
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(Body::from_stream(body))
        .unwrap()
}

async fn county_status(
    State(state): State<Arc<BackendState>>,
    Path(county): Path<String>,
) -> Response {
    if state.broken_status.contains(&county) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "status unavailable").into_response();
    }
    Json(json!({ "fileExists": state.catalogs.contains_key(&county) })).into_response()
}

async fn highway_distance(
    State(state): State<Arc<BackendState>>,
    Json(request): Json<Value>,
) -> Response {
    state.enrich_calls.fetch_add(1, Ordering::SeqCst);

    match &state.enrichment {
        EnrichmentReply::Distances {
            miles,
            warning,
            with_highway_data,
        } => {
            let requested = request["parcels"].as_array().cloned().unwrap_or_default();
            let total = requested.len();
            let parcels: Vec<Value> = requested
                .into_iter()
                .filter_map(|mut parcel| {
                    let id = parcel["parcelId"].as_str()?.to_string();
                    let distance = *miles.get(&id)?;
                    parcel["highwayDistance"] = json!({ "distanceMiles": distance });
                    parcel["highwayDistanceScore"] = json!((5.0 - distance).max(0.0));
                    Some(parcel)
                })
                .collect();

            let mut reply = json!({ "parcels": parcels });
            if let Some(warning) = warning {
                reply["warning"] = json!(warning);
            }
            if let Some(n) = with_highway_data {
                reply["summary"] = json!({ "withHighwayData": n, "total": total });
            }
            Json(reply).into_response()
        }
        EnrichmentReply::ErrorField(message) => Json(json!({ "error": message })).into_response(),
        EnrichmentReply::Status(code, body) => (
            StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body.clone(),
        )
            .into_response(),
    }
}
