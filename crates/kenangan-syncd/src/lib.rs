pub mod engine;
pub mod error;
pub mod session;
pub mod status;
pub mod store;

pub use engine::{LocalOperation, PullOutcome, PushHandle, SyncEngine, SyncOptions};
pub use error::{SyncError, SyncResult};
pub use session::{SyncSession, Veto};
pub use status::{SyncState, SyncStatus};
pub use store::{open_store, DocumentStore, HttpDocumentStore, MemoryDocumentStore, RemoteDocument};

use anyhow::Result;
use kenangan_core::{Config, ReplicaCache};

impl SyncOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            quiet_period: config.sync.quiet_period(),
            poll_interval: config.sync.interval(),
            cache: config.cache.resolved_path()?.map(ReplicaCache::new),
        })
    }
}

/// Open the configured store and start an engine on it
pub fn engine_from_config(config: &Config) -> Result<SyncEngine> {
    let options = SyncOptions::from_config(config)?;
    // An unreadable cache is reported by the engine; here it only means no seed
    let local_seed = options
        .cache
        .as_ref()
        .and_then(|cache| cache.load().ok().flatten());
    let store = open_store(&config.store, local_seed.as_ref())?;
    Ok(SyncEngine::start(store, options))
}

/// Log to stderr, honouring `RUST_LOG` on top of the given level
pub fn init_tracing(level: tracing::Level) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .try_init();
}
