//! Clients for the single-key remote document store.
//!
//! The store holds one opaque value: the whole collection serialized as JSON.
//! It never merges; a push overwrites the value, a pull returns whatever the
//! last push left there.

mod http;
mod memory;

pub use http::HttpDocumentStore;
pub use memory::MemoryDocumentStore;

use async_trait::async_trait;
use kenangan_core::config::StoreConfig;
use kenangan_core::Snapshot;
use std::sync::Arc;
use tracing::info;

use crate::error::SyncResult;

/// What a pull found under the document key
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteDocument {
    Found(Snapshot),
    /// The key has never been written. Equivalent to an empty collection.
    NotFound,
}

impl RemoteDocument {
    pub fn is_found(&self) -> bool {
        matches!(self, RemoteDocument::Found(_))
    }

    pub fn into_snapshot(self) -> Snapshot {
        match self {
            RemoteDocument::Found(snapshot) => snapshot,
            RemoteDocument::NotFound => Snapshot::default(),
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the current document, bypassing any intermediate cache
    async fn pull(&self) -> SyncResult<RemoteDocument>;

    /// Overwrite the document with the full snapshot
    async fn push(&self, snapshot: &Snapshot) -> SyncResult<()>;
}

/// Build the store described by the config.
///
/// Without an endpoint the replica syncs against an in-process store (local-only
/// mode). That store starts from `local_seed`, normally the cached replica, so
/// the initial forced pull does not wipe local data.
pub fn open_store(
    config: &StoreConfig,
    local_seed: Option<&Snapshot>,
) -> SyncResult<Arc<dyn DocumentStore>> {
    match config.endpoint {
        Some(ref endpoint) => {
            info!(%endpoint, "using remote document store");
            Ok(Arc::new(HttpDocumentStore::new(
                endpoint.clone(),
                config.timeout(),
                config.max_payload_bytes,
            )?))
        }
        None => {
            info!("no store endpoint configured, running in local-only mode");
            let store = MemoryDocumentStore::new();
            if let Some(snapshot) = local_seed {
                store.replace(snapshot)?;
            }
            Ok(Arc::new(store))
        }
    }
}
