mod fastembed_manager;
mod hashed;

pub use fastembed_manager::FastEmbedManager;
pub use hashed::HashedEmbedder;

use crate::config::EmbeddingConfig;
use crate::error::EmbeddingError;
use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};

/// Trait for embedding generation. Implementations must be safe to call
/// concurrently from multiple worker threads.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a batch of text
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the dimension of the embeddings
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Generate an embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(vec![text.to_string()])?
            .pop()
            .context("Embedding provider returned an empty batch")
    }
}

// The model is expensive to load, so one instance is shared process-wide
// and handed by reference into each analyzer.
static SHARED: Mutex<Option<Arc<FastEmbedManager>>> = Mutex::new(None);

/// Process-wide shared FastEmbed instance, initialized on first use with
/// the configured model. Later calls reuse the loaded model; a differing
/// requested name is logged and ignored.
pub fn shared_provider(config: &EmbeddingConfig) -> Result<Arc<FastEmbedManager>> {
    let mut guard = SHARED
        .lock()
        .map_err(|e| EmbeddingError::LockPoisoned(e.to_string()))?;

    if let Some(provider) = guard.as_ref() {
        if provider.model_name() != config.model_name {
            tracing::warn!(
                "Shared embedding model already loaded as {}, ignoring requested {}",
                provider.model_name(),
                config.model_name
            );
        }
        return Ok(provider.clone());
    }

    tracing::info!("Initializing shared embedding model {}", config.model_name);
    let manager = FastEmbedManager::from_name(&config.model_name)
        .map_err(|e| EmbeddingError::InitializationFailed(format!("{:#}", e)))?;
    let provider = Arc::new(manager);
    *guard = Some(provider.clone());
    Ok(provider)
}
