use super::EmbeddingProvider;
use crate::error::EmbeddingError;
use anyhow::{Context, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

/// FastEmbed-based embedding provider using all-MiniLM-L6-v2
///
/// `TextEmbedding::embed` needs `&mut self`, so the model sits behind a
/// mutex; encode calls from concurrent workers serialize on it.
pub struct FastEmbedManager {
    model: Mutex<TextEmbedding>,
    dimension: usize,
    model_name: &'static str,
}

impl FastEmbedManager {
    /// Create a new manager with the default model (all-MiniLM-L6-v2)
    pub fn new() -> Result<Self> {
        Self::with_model(EmbeddingModel::AllMiniLML6V2)
    }

    /// Create a manager for a configured model name.
    pub fn from_name(name: &str) -> Result<Self> {
        match model_for_name(name) {
            Some(model) => Self::with_model(model),
            None => anyhow::bail!("Unknown embedding model '{}'", name),
        }
    }

    /// Create a new manager with a specific model
    pub fn with_model(model: EmbeddingModel) -> Result<Self> {
        tracing::info!("Initializing FastEmbed model: {:?}", model);

        let (dimension, model_name) = match model {
            EmbeddingModel::AllMiniLML6V2 => (384, "all-MiniLM-L6-v2"),
            EmbeddingModel::AllMiniLML12V2 => (384, "all-MiniLM-L12-v2"),
            EmbeddingModel::BGESmallENV15 => (384, "bge-small-en-v1.5"),
            EmbeddingModel::BGEBaseENV15 => (768, "bge-base-en-v1.5"),
            _ => (384, "unknown"),
        };

        let mut options = InitOptions::default();
        options.model_name = model;
        options.show_download_progress = false;

        let embedding_model =
            TextEmbedding::try_new(options).context("Failed to initialize FastEmbed model")?;

        Ok(Self {
            model: Mutex::new(embedding_model),
            dimension,
            model_name,
        })
    }
}

fn model_for_name(name: &str) -> Option<EmbeddingModel> {
    let model = match name {
        "all-MiniLM-L6-v2" => EmbeddingModel::AllMiniLML6V2,
        "all-MiniLM-L12-v2" => EmbeddingModel::AllMiniLML12V2,
        "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        _ => return None,
    };
    Some(model)
}

impl EmbeddingProvider for FastEmbedManager {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::LockPoisoned(e.to_string()))?;

        model
            .embed(texts, None)
            .map_err(|e| EmbeddingError::GenerationFailed(e.to_string()).into())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        self.model_name
    }
}
