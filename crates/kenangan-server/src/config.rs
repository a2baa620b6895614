use anyhow::Context;
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf};

/// Server configuration loaded from TOML file
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Network settings for the HTTP server
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    /// Host/interface to bind to, e.g. "127.0.0.1"
    pub host: String,
    /// Port to listen on, e.g. 3002
    pub port: u16,
}

/// Where documents are kept and how big they may get
#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    /// One file per document key. Relative paths are resolved against the
    /// config file's directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Larger POST bodies are refused with 413
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("kenangan_server_data")
}

fn default_max_body_bytes() -> usize {
    5 * 1024 * 1024 // 5MB
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Settings {
    /// Load and parse the configuration from the given TOML file path
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut settings: Settings = toml::from_str(&data)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        if settings.storage.data_dir.is_relative() {
            if let Some(parent) = path.parent() {
                settings.storage.data_dir = parent.join(&settings.storage.data_dir);
            }
        }
        Ok(settings)
    }
}
