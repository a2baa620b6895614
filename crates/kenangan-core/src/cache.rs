use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::Snapshot;

/// On-disk mirror of the local replica.
///
/// Only used to render something immediately on a cold start. Whatever it
/// holds is superseded by the first successful forced pull.
#[derive(Debug, Clone)]
pub struct ReplicaCache {
    path: PathBuf,
}

impl ReplicaCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached snapshot. A missing or empty file means nothing cached.
    pub fn load(&self) -> Result<Option<Snapshot>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(Error::Cache {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(Some(Snapshot::from_json(&bytes)?))
    }

    /// Replace the cached snapshot. Written to a sibling file first and renamed
    /// so a crash never leaves a half-written cache behind.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let io_err = |source: std::io::Error| Error::Cache {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, snapshot.to_json()?).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}
