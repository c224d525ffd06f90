/// Centralized error types for reposcope using thiserror
///
/// Per-item failures (one file, one diff, one parent) are contained at the
/// smallest scope and never surface here; these types cover the taxonomy a
/// caller can actually act on.
use thiserror::Error;

/// Main error type for the analysis engine
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Crawl error: {0}")]
    Crawl(#[from] CrawlError),

    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Git error: {0}")]
    Git(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Fatal crawl conditions. Anything below the root level is downgraded to a
/// binary sentinel instead.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Working tree root not found: {0}")]
    RootNotFound(String),

    #[error("Working tree root is not a directory: {0}")]
    NotADirectory(String),

    #[error("Failed to walk working tree: {0}")]
    WalkFailed(String),
}

/// Structured outcome of commit resolution. `NotFound` and `FetchTimeout`
/// are deliberately distinct: a shallow clone routinely cannot reach old
/// history, and the caller should be told which case it hit.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Commit reference '{0}' contains no valid hexadecimal characters")]
    InvalidHash(String),

    #[error("Commit '{0}' not found in local history or on the remote")]
    NotFound(String),

    #[error(
        "Fetching commit '{hash}' timed out after {seconds}s; \
         the clone may be shallow - try a more recent commit"
    )]
    FetchTimeout { hash: String, seconds: u64 },

    #[error("Transient error while resolving '{hash}': {reason}")]
    Transient { hash: String, reason: String },
}

/// Errors related to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    InitializationFailed(String),

    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),

    #[error("Model lock was poisoned: {0}")]
    LockPoisoned(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

impl From<git2::Error> for AnalyzerError {
    fn from(err: git2::Error) -> Self {
        AnalyzerError::Git(err.message().to_string())
    }
}

impl From<anyhow::Error> for AnalyzerError {
    fn from(err: anyhow::Error) -> Self {
        AnalyzerError::Other(format!("{:#}", err))
    }
}

impl AnalyzerError {
    pub fn other(msg: impl Into<String>) -> Self {
        AnalyzerError::Other(msg.into())
    }

    /// User errors are bad input, not system faults.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AnalyzerError::Resolve(ResolveError::InvalidHash(_))
                | AnalyzerError::Resolve(ResolveError::NotFound(_))
                | AnalyzerError::Config(ConfigError::InvalidValue { .. })
        )
    }

    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalyzerError::Resolve(ResolveError::Transient { .. })
                | AnalyzerError::Resolve(ResolveError::FetchTimeout { .. })
                | AnalyzerError::Io(_)
        )
    }
}
