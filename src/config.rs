/// Configuration for the analysis engine
///
/// Every tunable the engine uses is an explicit field here and is passed into
/// constructors; there is no ambient global state. Priority when loading:
/// Environment variables > Config file > Defaults.
use crate::error::{AnalyzerError, ConfigError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalyzerConfig {
    /// Working-tree crawl configuration
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Commit history indexing configuration
    #[serde(default)]
    pub history: HistoryConfig,

    /// Commit resolution configuration
    #[serde(default)]
    pub resolve: ResolveConfig,

    /// Relevance ranking configuration
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// Working-tree crawl configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Maximum number of characters of a text file handed to the embedding
    /// provider (bounds provider cost per file)
    #[serde(default = "default_max_embed_chars")]
    pub max_embed_chars: usize,

    /// Files larger than this are recorded with the binary sentinel
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Number of leading bytes sampled when sniffing blob content for NUL bytes
    #[serde(default = "default_binary_sniff_bytes")]
    pub binary_sniff_bytes: usize,
}

/// Commit history indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of most-recent commits indexed per analysis run
    #[serde(default = "default_max_commits")]
    pub max_commits: usize,
}

/// Commit resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Ceiling on file-change entries computed for a single commit
    #[serde(default = "default_change_ceiling")]
    pub change_ceiling: usize,

    /// Overall timeout for a targeted fetch-by-hash from the remote
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Remote used for fetch-by-hash fallback
    #[serde(default = "default_remote")]
    pub remote: String,
}

/// Relevance ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Default top-K for file ranking
    #[serde(default = "default_file_top_k")]
    pub file_top_k: usize,

    /// Default top-K for commit ranking
    #[serde(default = "default_commit_top_k")]
    pub commit_top_k: usize,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_model_name")]
    pub model_name: String,
}

// Default value functions
fn default_max_embed_chars() -> usize {
    5_000
}

fn default_max_file_size() -> u64 {
    2_097_152 // 2 MiB
}

fn default_binary_sniff_bytes() -> usize {
    8_192
}

fn default_max_commits() -> usize {
    50
}

fn default_change_ceiling() -> usize {
    200
}

fn default_fetch_timeout() -> u64 {
    8
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_file_top_k() -> usize {
    10
}

fn default_commit_top_k() -> usize {
    5
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_embed_chars: default_max_embed_chars(),
            max_file_size: default_max_file_size(),
            binary_sniff_bytes: default_binary_sniff_bytes(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_commits: default_max_commits(),
        }
    }
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            change_ceiling: default_change_ceiling(),
            fetch_timeout_secs: default_fetch_timeout(),
            remote: default_remote(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            file_top_k: default_file_top_k(),
            commit_top_k: default_commit_top_k(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, AnalyzerError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: AnalyzerConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_usize("REPOSCOPE_MAX_COMMITS") {
            self.history.max_commits = v;
        }
        if let Some(v) = env_usize("REPOSCOPE_CHANGE_CEILING") {
            self.resolve.change_ceiling = v;
        }
        if let Some(v) = env_usize("REPOSCOPE_MAX_EMBED_CHARS") {
            self.crawl.max_embed_chars = v;
        }
        if let Ok(v) = std::env::var("REPOSCOPE_FETCH_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse() {
                self.resolve.fetch_timeout_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("REPOSCOPE_REMOTE") {
            self.resolve.remote = v;
        }
        if let Ok(v) = std::env::var("REPOSCOPE_MODEL_NAME") {
            self.embedding.model_name = v;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), AnalyzerError> {
        if self.history.max_commits == 0 {
            return Err(ConfigError::InvalidValue {
                key: "history.max_commits".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.resolve.change_ceiling == 0 {
            return Err(ConfigError::InvalidValue {
                key: "resolve.change_ceiling".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.resolve.fetch_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "resolve.fetch_timeout_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.crawl.max_embed_chars == 0 {
            return Err(ConfigError::InvalidValue {
                key: "crawl.max_embed_chars".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.resolve.remote.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "resolve.remote".to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
