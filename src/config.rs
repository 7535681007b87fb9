use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub youtube: YoutubeConfig,

    pub ingestor: IngestorConfig,

    pub database: DatabaseConfig,

    pub server: ServerConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            worker_threads: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    pub api_key: String,

    pub base_url: String,

    /// Page size requested from the search endpoint. Only one page is fetched per poll.
    pub max_results: u32,

    /// Request timeout in seconds (default: 30)
    pub request_timeout_seconds: u32,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            max_results: 50,
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestorConfig {
    pub poll_interval_seconds: u64,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mongodb,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,

    pub uri: String,

    /// Database name. Required; there is no sensible default.
    pub name: String,

    /// Seconds to wait for the initial ping (default: 10)
    pub connect_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Mongodb,
            uri: "mongodb://0.0.0.0:27017".to_string(),
            name: String::new(),
            connect_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub default_limit: u64,

    /// Requests asking for more than this are clamped.
    pub max_limit: u64,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            default_limit: 10,
            max_limit: 50,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    /// Standalone exporter port for the ingestor, which has no HTTP server of its own.
    pub metrics_port: Option<u16>,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            metrics_port: None,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

impl Config {
    /// First existing file among the default search paths.
    #[must_use]
    pub fn find_config_file() -> Option<PathBuf> {
        Self::config_paths().into_iter().find(|path| path.exists())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Applies `API_KEY`, `POLL_INTERVAL`, `MONGO_URI` and `MONGO_DB` on top of the file config.
    ///
    /// Empty values are ignored. An unparsable `POLL_INTERVAL` keeps the configured interval
    /// and is reported in the returned warnings, which the caller logs once tracing is up.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut warnings = Vec::new();

        if let Some(key) = get("API_KEY") {
            self.youtube.api_key = key;
        }

        if let Some(raw) = get("POLL_INTERVAL") {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.ingestor.poll_interval_seconds = secs,
                Err(_) => warnings.push(format!(
                    "Unable to parse POLL_INTERVAL '{raw}'. Using {} seconds",
                    self.ingestor.poll_interval_seconds
                )),
            }
        }

        if let Some(uri) = get("MONGO_URI") {
            self.database.uri = uri;
        }

        if let Some(name) = get("MONGO_DB") {
            self.database.name = name;
        }

        warnings
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("tubewatch").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".tubewatch").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.name.trim().is_empty() {
            anyhow::bail!("Database name missing: set [database].name or MONGO_DB");
        }

        if self.database.backend == StoreBackend::Mongodb && self.database.uri.is_empty() {
            anyhow::bail!("Database URI cannot be empty for the mongodb backend");
        }

        if self.ingestor.poll_interval_seconds == 0 {
            anyhow::bail!("Poll interval must be > 0");
        }

        if self.server.default_limit == 0 || self.server.max_limit == 0 {
            anyhow::bail!("Page limits must be > 0");
        }

        if self.server.default_limit > self.server.max_limit {
            anyhow::bail!(
                "Default limit {} exceeds max limit {}",
                self.server.default_limit,
                self.server.max_limit
            );
        }

        Ok(())
    }

    /// Extra checks that only matter when running the ingestor.
    pub fn validate_for_ingest(&self) -> Result<()> {
        self.validate()?;

        if self.youtube.api_key.trim().is_empty() {
            anyhow::bail!("Missing API key: set [youtube].api_key or API_KEY");
        }

        if self.youtube.max_results == 0 {
            anyhow::bail!("[youtube].max_results must be > 0");
        }

        Ok(())
    }
}
