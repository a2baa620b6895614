use async_trait::async_trait;
use kenangan_core::Snapshot;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use reqwest::StatusCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use super::{DocumentStore, RemoteDocument};
use crate::error::{SyncError, SyncResult};

/// GET/POST client for one document URL
pub struct HttpDocumentStore {
    client: reqwest::Client,
    endpoint: String,
    max_payload_bytes: u64,
    requests: AtomicU64,
}

impl HttpDocumentStore {
    pub fn new(endpoint: String, timeout: Duration, max_payload_bytes: u64) -> SyncResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            max_payload_bytes,
            requests: AtomicU64::new(0),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Unique per request so no HTTP or proxy cache can answer a pull
    fn cache_buster(&self) -> String {
        let seq = self.requests.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", kenangan_core::now_millis(), seq)
    }
}

async fn error_body(response: reqwest::Response) -> std::sync::Arc<str> {
    response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(200)
        .collect::<String>()
        .into()
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn pull(&self) -> SyncResult<RemoteDocument> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("_", self.cache_buster())])
            .header(CACHE_CONTROL, "no-cache, no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(endpoint = %self.endpoint, "document not found");
            return Ok(RemoteDocument::NotFound);
        }
        if !status.is_success() {
            return Err(SyncError::Status {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        let bytes = response.bytes().await?;
        let text = String::from_utf8_lossy(&bytes);
        let trimmed = text.trim();
        // Some stores answer 200 with an empty or null body for unset keys
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(RemoteDocument::NotFound);
        }
        Ok(RemoteDocument::Found(Snapshot::from_json(&bytes)?))
    }

    async fn push(&self, snapshot: &Snapshot) -> SyncResult<()> {
        let body = snapshot.to_json()?;
        let size = body.len() as u64;
        if size > self.max_payload_bytes {
            return Err(SyncError::PayloadTooLarge {
                size,
                limit: self.max_payload_bytes,
            });
        }

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Err(SyncError::PayloadTooLarge {
                size,
                limit: self.max_payload_bytes,
            });
        }
        if !status.is_success() {
            return Err(SyncError::Status {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }
        debug!(endpoint = %self.endpoint, bytes = size, "snapshot pushed");
        Ok(())
    }
}
