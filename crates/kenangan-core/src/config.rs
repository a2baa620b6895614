use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_HEADER: &str = r#"# Kenangan Configuration File
# Leave [store].endpoint unset to run in local-only mode

"#;

/// Configuration for kenangan clients
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Where the shared document lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Full URL of the document key, e.g. `http://127.0.0.1:3002/api/documents/albums`.
    /// If None, runs in local-only mode.
    pub endpoint: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Largest serialized snapshot the store accepts (in bytes)
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Background pull interval in seconds
    #[serde(default = "default_sync_interval")]
    pub interval_seconds: u64,

    /// How long after a push completes scheduled pulls stay suppressed
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Display name stamped on new photos and comments
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Mirror the replica to disk for instant cold starts
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Cache file (defaults to ~/.local/share/kenangan/replica.json)
    pub path: Option<PathBuf>,
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_payload_bytes() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_sync_interval() -> u64 {
    15
}

fn default_quiet_period_ms() -> u64 {
    3_000
}

fn default_cache_enabled() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_seconds: default_timeout_seconds(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval_seconds: default_sync_interval(),
            quiet_period_ms: default_quiet_period_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            path: None,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl SyncSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }
}

impl CacheConfig {
    /// Resolved cache file, or None when caching is disabled
    pub fn resolved_path(&self) -> Result<Option<PathBuf>> {
        if !self.enabled {
            return Ok(None);
        }
        if let Some(ref path) = self.path {
            return Ok(Some(path.clone()));
        }
        let home_dir = dirs::home_dir().context("Could not determine home directory")?;
        Ok(Some(
            home_dir
                .join(".local")
                .join("share")
                .join("kenangan")
                .join("replica.json"),
        ))
    }
}

impl Config {
    /// Load configuration from `$KENANGAN_CONFIG` or the default location,
    /// writing a default file when none exists yet
    pub fn load() -> Result<Self> {
        if let Ok(custom_path) = std::env::var("KENANGAN_CONFIG") {
            return Self::load_from(&PathBuf::from(custom_path));
        }
        let config_path = Self::default_path()?;
        if !config_path.exists() {
            let default_config = Self::default();
            default_config.save_to(&config_path)?;
            return Ok(default_config);
        }
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Write configuration (with the explanatory header) to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, format!("{}{}", CONFIG_HEADER, toml_str))
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Always ~/.config/kenangan/config.toml regardless of platform
    pub fn default_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home_dir.join(".config").join("kenangan").join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.sync.interval_seconds == 0 {
            bail!("sync.interval_seconds must be at least 1");
        }
        if self.store.timeout_seconds == 0 {
            bail!("store.timeout_seconds must be at least 1");
        }
        if let Some(ref endpoint) = self.store.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                bail!("store.endpoint must be an http(s) URL, got '{}'", endpoint);
            }
        }
        Ok(())
    }
}
