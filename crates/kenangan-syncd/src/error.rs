use std::sync::Arc;
use thiserror::Error;

/// Result type alias for sync operations
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Failures talking to the document store.
///
/// Cloneable so one failure can be handed to the status channel and to the
/// caller waiting on the mutation that triggered it.
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    /// Connection refused, timeout, TLS failure and the like
    #[error("document store unreachable: {0}")]
    Network(Arc<str>),

    /// Any non-2xx answer other than 404 on pull and 413 on push
    #[error("document store answered HTTP {status}: {body}")]
    Status { status: u16, body: Arc<str> },

    /// The snapshot is bigger than the store accepts. Nothing was written.
    #[error(
        "snapshot is {size} bytes but the store accepts at most {limit}; \
         try adding fewer or smaller photos at once"
    )]
    PayloadTooLarge { size: u64, limit: u64 },

    /// The stored document is not a valid snapshot
    #[error("document store returned an unreadable snapshot: {0}")]
    Decode(Arc<str>),

    #[error("sync engine has shut down")]
    Shutdown,
}

impl SyncError {
    pub fn is_payload_too_large(&self) -> bool {
        matches!(self, SyncError::PayloadTooLarge { .. })
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Network(e.to_string().into())
    }
}

impl From<kenangan_core::Error> for SyncError {
    fn from(e: kenangan_core::Error) -> Self {
        SyncError::Decode(e.to_string().into())
    }
}
