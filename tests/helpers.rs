// Shared test helpers: a mock bulk backend and pipeline fixtures.
//
// This module provides common utilities used across multiple test files to
// reduce duplication.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

use bgp_indexer::{
    BulkClient, Config, GeoError, GeoLookup, LookupCache, Pipeline, PipelineReport, PrefixMeta,
};

/// Mock bulk backend state, shared with the running axum server.
///
/// `failures` maps a document prefix to how many more times the backend
/// should reject it with a 429 item status before accepting it. A prefix
/// with `u32::MAX` is rejected forever.
#[derive(Clone, Default)]
pub struct MockBackend {
    pub failures: Arc<Mutex<HashMap<String, u32>>>,
    pub indexed: Arc<Mutex<Vec<serde_json::Value>>>,
    pub bulk_requests: Arc<AtomicUsize>,
}

impl MockBackend {
    /// Schedules `times` rejections for a prefix before it is accepted.
    #[allow(dead_code)] // Used by other test files
    pub fn fail_times(&self, prefix: &str, times: u32) {
        self.failures
            .lock()
            .unwrap()
            .insert(prefix.to_string(), times);
    }

    /// Prefixes the backend has accepted, in arrival order.
    #[allow(dead_code)]
    pub fn indexed_prefixes(&self) -> Vec<String> {
        self.indexed
            .lock()
            .unwrap()
            .iter()
            .filter_map(|doc| doc["prefix"].as_str().map(String::from))
            .collect()
    }
}

async fn handle_root() -> impl IntoResponse {
    Json(json!({ "tagline": "You Know, for Search" }))
}

async fn handle_bulk(State(state): State<MockBackend>, body: String) -> impl IntoResponse {
    state.bulk_requests.fetch_add(1, Ordering::SeqCst);

    let mut items = Vec::new();
    let mut errors = false;
    let mut lines = body.lines();
    // NDJSON bodies alternate action and document lines.
    while let (Some(_action), Some(doc_line)) = (lines.next(), lines.next()) {
        let doc: serde_json::Value = serde_json::from_str(doc_line).expect("valid document line");
        let prefix = doc["prefix"].as_str().unwrap_or_default().to_string();

        let reject = {
            let mut failures = state.failures.lock().unwrap();
            match failures.get_mut(&prefix) {
                Some(remaining) if *remaining == u32::MAX => true,
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        };

        if reject {
            errors = true;
            items.push(json!({
                "index": {
                    "status": 429,
                    "error": { "type": "es_rejected_execution_exception" }
                }
            }));
        } else {
            state.indexed.lock().unwrap().push(doc);
            items.push(json!({ "index": { "status": 201 } }));
        }
    }

    Json(json!({ "errors": errors, "items": items }))
}

/// Starts a mock bulk backend on an ephemeral port.
///
/// Answers `GET /` for the startup health check and `POST /_bulk` with
/// per-document item statuses driven by the returned state handle.
pub async fn spawn_mock_backend() -> (MockBackend, String) {
    let state = MockBackend::default();
    let app = Router::new()
        .route("/", get(handle_root))
        .route("/_bulk", post(handle_bulk))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock backend");
    let addr = listener.local_addr().expect("Failed to get local address");
    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Mock backend server failed");
    });

    (state, format!("http://{addr}"))
}

/// Table-backed geo resolver: prefix string to country code.
///
/// Version classification still goes through the real prefix parser, so
/// malformed CIDRs fail here exactly as with the MaxMind-backed resolver.
pub struct StaticGeo {
    countries: HashMap<String, String>,
}

impl StaticGeo {
    pub fn new(countries: &[(&str, &str)]) -> Self {
        StaticGeo {
            countries: countries
                .iter()
                .map(|(prefix, country)| (prefix.to_string(), country.to_string()))
                .collect(),
        }
    }
}

impl GeoLookup for StaticGeo {
    fn resolve(&self, cidr: &str) -> Result<PrefixMeta, GeoError> {
        let (_, version) = bgp_indexer::parse_prefix(cidr)?;
        Ok(PrefixMeta {
            version,
            country_code: self.countries.get(cidr).cloned(),
        })
    }
}

/// Writes one NDJSON chunk file and returns its path.
pub fn write_chunk(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, lines.join("\n") + "\n").expect("Failed to write chunk file");
    path
}

/// Writes a two-column ASN CSV (with header row) and returns its path.
pub fn write_asn_csv(dir: &Path, rows: &[(&str, &str)]) -> PathBuf {
    let path = dir.join("asn.csv");
    let mut body = String::from("asn,description\n");
    for (asn, description) in rows {
        body.push_str(&format!("{asn},{description}\n"));
    }
    std::fs::write(&path, body).expect("Failed to write ASN CSV");
    path
}

/// A config tuned for fast tests: short pacing and backoff, unique cache dir.
pub fn test_config(elastic_url: &str, tmp: &Path) -> Config {
    Config {
        elastic_url: elastic_url.to_string(),
        cache_dir: tmp.join("cache"),
        pacing_delay_ms: 1,
        backoff_base_ms: 10,
        ..Default::default()
    }
}

/// Assembles and runs a pipeline with a stub geo resolver and a real lookup
/// cache warmed from `config.asn_csv`.
pub async fn run_with_static_geo(
    config: Config,
    countries: &[(&str, &str)],
) -> anyhow::Result<PipelineReport> {
    let cache = LookupCache::open(&config.cache_dir).await?;
    cache.warm(&config.asn_csv).await?;

    let geo = Arc::new(StaticGeo::new(countries));
    let client = Arc::new(BulkClient::new(&config)?);

    Pipeline::new(config, Arc::new(cache), geo, client)
        .run()
        .await
}
