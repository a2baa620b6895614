use anyhow::Context;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

/// Document keys end up as file names, so only a conservative charset is allowed
pub fn is_valid_key(key: &str) -> bool {
    lazy_static::lazy_static! {
        static ref KEY_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]{1,128}$").unwrap();
    }
    KEY_RE.is_match(key)
}

/// Opaque values stored one file per key.
///
/// Writes replace the whole value. There is no merging and no versioning:
/// whichever POST lands last is what every later GET returns.
#[derive(Debug)]
pub struct DocumentDirectory {
    root: PathBuf,
    writes: Mutex<()>,
}

impl DocumentDirectory {
    pub async fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .with_context(|| format!("failed to create data directory {}", root.display()))?;
        Ok(Self {
            root,
            writes: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Stored value, or None if the key was never written
    pub async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    /// Replace the value under `key`
    pub async fn put(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        let path = self.path_for(key);
        let tmp = self.root.join(format!("{key}.json.tmp"));

        // Readers only ever see a complete file
        let _guard = self.writes.lock().await;
        fs::write(&tmp, value)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }
}
