use async_trait::async_trait;
use kenangan_core::Snapshot;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{DocumentStore, RemoteDocument};
use crate::error::{SyncError, SyncResult};

#[derive(Default)]
struct Document {
    /// Serialized value, exactly what an HTTP store would hold
    value: Option<Vec<u8>>,
    latency: Duration,
    fail_pulls: bool,
    fail_pushes: bool,
    max_payload_bytes: Option<u64>,
    pushes: usize,
}

/// In-process document store.
///
/// Backs local-only mode and lets several engines share one "remote" in
/// tests. Clones share the same document.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<Mutex<Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: &Snapshot) -> SyncResult<Self> {
        let store = Self::new();
        store.replace(snapshot)?;
        Ok(store)
    }

    fn document(&self) -> MutexGuard<'_, Document> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrite the stored value directly, as another client's push would
    pub fn replace(&self, snapshot: &Snapshot) -> SyncResult<()> {
        self.document().value = Some(snapshot.to_json()?);
        Ok(())
    }

    /// Decode the stored value, if any
    pub fn stored(&self) -> SyncResult<Option<Snapshot>> {
        match self.document().value {
            Some(ref bytes) => Ok(Some(Snapshot::from_json(bytes)?)),
            None => Ok(None),
        }
    }

    /// Delay every response by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.document().latency = latency;
    }

    pub fn fail_pulls(&self, fail: bool) {
        self.document().fail_pulls = fail;
    }

    pub fn fail_pushes(&self, fail: bool) {
        self.document().fail_pushes = fail;
    }

    pub fn set_max_payload_bytes(&self, limit: Option<u64>) {
        self.document().max_payload_bytes = limit;
    }

    /// Number of pushes that reached the store, including failed ones
    pub fn push_count(&self) -> usize {
        self.document().pushes
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn pull(&self) -> SyncResult<RemoteDocument> {
        // The answer reflects the value when the request arrived
        let (value, latency, fail) = {
            let doc = self.document();
            (doc.value.clone(), doc.latency, doc.fail_pulls)
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if fail {
            return Err(SyncError::Network("simulated pull failure".into()));
        }
        match value {
            Some(bytes) => Ok(RemoteDocument::Found(Snapshot::from_json(&bytes)?)),
            None => Ok(RemoteDocument::NotFound),
        }
    }

    async fn push(&self, snapshot: &Snapshot) -> SyncResult<()> {
        let body = snapshot.to_json()?;
        let latency = {
            let mut doc = self.document();
            doc.pushes += 1;
            doc.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        // The write lands when the response is produced
        let mut doc = self.document();
        if doc.fail_pushes {
            return Err(SyncError::Network("simulated push failure".into()));
        }
        if let Some(limit) = doc.max_payload_bytes {
            let size = body.len() as u64;
            if size > limit {
                return Err(SyncError::PayloadTooLarge { size, limit });
            }
        }
        doc.value = Some(body);
        Ok(())
    }
}
