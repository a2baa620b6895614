use std::path::PathBuf;
use thiserror::Error;

/// Result alias for model and cache operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("album name must not be blank")]
    BlankName,

    #[error("invalid snapshot document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("replica cache {}: {source}", path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
