use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct NotegraphConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub graph: GraphConfig,
    pub search: SearchConfig,
    pub dedup: DedupConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub dimensions: usize,
    /// Chunk size in characters.
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GraphConfig {
    pub damping: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Minimum number of shared sources before two targets get a `co_occurs` edge.
    /// Zero disables co-occurrence edges.
    pub min_cooccurrence: usize,
    pub related_max_distance: usize,
    pub similarity_threshold: f64,
    pub top_n: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub default_top_k: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DedupConfig {
    pub fuzzy_threshold: f64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_notegraph_dir()
            .join("knowledge.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            endpoint: "https://api.openai.com/v1".into(),
            model: "text-embedding-3-small".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            dimensions: 1536,
            chunk_size: 2000,
            chunk_overlap: 200,
            batch_size: 16,
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
            min_cooccurrence: 2,
            related_max_distance: 2,
            similarity_threshold: 0.3,
            top_n: 20,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { default_top_k: 10 }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.8,
        }
    }
}

/// Returns `~/.notegraph/`
pub fn default_notegraph_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".notegraph")
}

/// Returns the default config file path: `~/.notegraph/config.toml`
pub fn default_config_path() -> PathBuf {
    default_notegraph_dir().join("config.toml")
}

impl NotegraphConfig {
    /// Load config from the default TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load a config file the user named explicitly. Unlike [`Self::load_from`],
    /// a missing file is an error rather than a fallback to defaults.
    pub fn load_required(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("config file not found: {}", path.display());
        }
        Self::load_from(path)
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("failed to parse config TOML {}", path.display()))?
        } else {
            info!("no config file at {}, using defaults", path.display());
            NotegraphConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (NOTEGRAPH_DB, NOTEGRAPH_LOG_LEVEL, NOTEGRAPH_EMBEDDING_MODEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("NOTEGRAPH_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("NOTEGRAPH_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("NOTEGRAPH_EMBEDDING_MODEL") {
            self.embedding.model = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
