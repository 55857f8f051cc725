//! Bulk client implementation.

use std::time::Duration;

use log::{debug, info, warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tokio::time::Instant;

use crate::config::{Config, CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS};
use crate::error_handling::DeliveryError;
use crate::models::EnrichedDocument;

/// Result of delivering one batch.
///
/// Every document ends up exactly once in either the success count or the
/// failed list; the pipeline requeues the failed list for retry.
#[derive(Debug, Default)]
pub struct BulkOutcome {
    /// Documents the backend accepted.
    pub succeeded: u64,
    /// Documents lost to transport errors or rejected by the backend.
    pub failed: Vec<EnrichedDocument>,
}

/// HTTP client for the backend's bulk API.
///
/// Cheap to share: `reqwest::Client` is internally reference-counted, and
/// the configured connection pool bounds concurrency against the backend.
pub struct BulkClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    index: String,
    flush_bytes: usize,
    flush_interval: Duration,
}

impl BulkClient {
    /// Builds the client from configuration.
    ///
    /// Applies connect and overall request timeouts; a bulk request that
    /// times out counts as a full failure of that sub-request and is
    /// retried by the pipeline like any other transport error.
    pub fn new(config: &Config) -> Result<Self, DeliveryError> {
        let http = reqwest::ClientBuilder::new()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(DeliveryError::Client)?;

        Ok(BulkClient {
            http,
            base_url: config.elastic_url.trim_end_matches('/').to_string(),
            api_key: config.elastic_api_key.clone(),
            index: config.index.clone(),
            flush_bytes: config.flush_bytes,
            flush_interval: Duration::from_secs(config.flush_interval_secs),
        })
    }

    /// Startup connectivity check against the backend root endpoint.
    ///
    /// Fatal on failure: if the backend is unreachable before any work is
    /// enqueued, nothing useful can happen.
    pub async fn ping(&self) -> Result<(), DeliveryError> {
        let request = self.authorize(self.http.get(&self.base_url));
        let response = request.send().await.map_err(DeliveryError::Connect)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Unhealthy(status.as_u16()));
        }
        info!("Bulk backend reachable at {}", self.base_url);
        Ok(())
    }

    /// Delivers a batch of documents via the `_bulk` API.
    ///
    /// The NDJSON body is flushed as a sub-request whenever it reaches the
    /// byte threshold or the flush interval elapses, whichever first. Body
    /// assembly itself is synchronous, so the interval only comes into play
    /// once a prior sub-request has spent network time; the byte threshold
    /// is the operative limit within a freshly started body. Each
    /// document's outcome is recorded independently; an empty input is a
    /// no-op. The only hard error is a document that fails to serialize.
    pub async fn bulk(&self, docs: &[EnrichedDocument]) -> Result<BulkOutcome, DeliveryError> {
        let mut outcome = BulkOutcome::default();
        if docs.is_empty() {
            return Ok(outcome);
        }

        let action = format!(
            "{}\n",
            serde_json::json!({ "index": { "_index": self.index } })
        );

        let mut body = String::new();
        let mut positions: Vec<usize> = Vec::new();
        let mut last_flush = Instant::now();

        for (i, doc) in docs.iter().enumerate() {
            body.push_str(&action);
            body.push_str(&serde_json::to_string(doc)?);
            body.push('\n');
            positions.push(i);

            if body.len() >= self.flush_bytes || last_flush.elapsed() >= self.flush_interval {
                self.send_sub_request(
                    std::mem::take(&mut body),
                    std::mem::take(&mut positions),
                    docs,
                    &mut outcome,
                )
                .await;
                last_flush = Instant::now();
            }
        }
        if !positions.is_empty() {
            self.send_sub_request(body, positions, docs, &mut outcome)
                .await;
        }

        Ok(outcome)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(AUTHORIZATION, format!("ApiKey {key}")),
            None => request,
        }
    }

    /// Sends one sub-request and folds its per-document outcomes into
    /// `outcome`. Transport errors mark every document of this sub-request
    /// failed; they are never fatal here.
    async fn send_sub_request(
        &self,
        body: String,
        positions: Vec<usize>,
        docs: &[EnrichedDocument],
        outcome: &mut BulkOutcome,
    ) {
        let url = format!("{}/_bulk", self.base_url);
        let request = self
            .authorize(self.http.post(&url))
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("bulk request failed ({} docs): {e}", positions.len());
                mark_all_failed(&positions, docs, outcome);
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(
                "bulk request rejected with status {status} ({} docs)",
                positions.len()
            );
            mark_all_failed(&positions, docs, outcome);
            return;
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!("failed to read bulk response body: {e}");
                mark_all_failed(&positions, docs, outcome);
                return;
            }
        };

        match serde_json::from_str::<BulkResponse>(&text) {
            Ok(parsed) => {
                debug!(
                    "bulk sub-request: {} docs, status {}",
                    positions.len(),
                    status
                );
                apply_response(&parsed, &positions, docs, outcome);
            }
            Err(e) => {
                warn!("unparseable bulk response: {e}");
                mark_all_failed(&positions, docs, outcome);
            }
        }
    }
}

fn mark_all_failed(positions: &[usize], docs: &[EnrichedDocument], outcome: &mut BulkOutcome) {
    outcome
        .failed
        .extend(positions.iter().map(|&pos| docs[pos].clone()));
}

/// Folds a parsed bulk response into the outcome, pairing response items
/// with the documents of this sub-request by position. An item missing from
/// the response counts as a failure for its document.
fn apply_response(
    response: &BulkResponse,
    positions: &[usize],
    docs: &[EnrichedDocument],
    outcome: &mut BulkOutcome,
) {
    if !response.errors && response.items.len() == positions.len() {
        outcome.succeeded += positions.len() as u64;
        return;
    }

    for (slot, &pos) in positions.iter().enumerate() {
        match response.items.get(slot).and_then(BulkItem::status) {
            Some(item) if (200..300).contains(&item.status) => outcome.succeeded += 1,
            Some(item) => {
                debug!(
                    "document {} rejected (status {}): {:?}",
                    docs[pos].prefix, item.status, item.error
                );
                outcome.failed.push(docs[pos].clone());
            }
            None => outcome.failed.push(docs[pos].clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<BulkItem>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    #[serde(default)]
    index: Option<BulkItemStatus>,
    #[serde(default)]
    create: Option<BulkItemStatus>,
}

impl BulkItem {
    fn status(&self) -> Option<&BulkItemStatus> {
        self.index.as_ref().or(self.create.as_ref())
    }
}

#[derive(Debug, Deserialize)]
struct BulkItemStatus {
    status: u16,
    #[serde(default)]
    error: Option<serde_json::Value>,
}
