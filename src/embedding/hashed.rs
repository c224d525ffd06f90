use super::EmbeddingProvider;
use anyhow::Result;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Deterministic token-hashing embedder.
///
/// Buckets lowercased alphanumeric tokens into a fixed-size vector and
/// L2-normalizes the result. No model download, no network, fully
/// deterministic across runs - useful offline and as a test double where
/// repeatability matters more than semantic quality.
pub struct HashedEmbedder {
    dimension: usize,
}

impl HashedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimension;
            vector[bucket] += 1.0;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        vector
    }
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EmbeddingProvider for HashedEmbedder {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.encode(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hashed-tokens"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let embedder = HashedEmbedder::new(32);
        let a = embedder.embed("walk the commit graph").unwrap();
        let b = embedder.embed("walk the commit graph").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_dimension() {
        let embedder = HashedEmbedder::new(16);
        let v = embedder.embed("hello world").unwrap();
        assert_eq!(v.len(), 16);
        assert_eq!(embedder.dimension(), 16);
    }

    #[test]
    fn test_normalized() {
        let embedder = HashedEmbedder::new(32);
        let v = embedder.embed("some text with several tokens").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashedEmbedder::new(8);
        let v = embedder.embed("").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_similar_texts_overlap() {
        let embedder = HashedEmbedder::new(64);
        let a = embedder.embed("parse the configuration file").unwrap();
        let b = embedder.embed("parse the configuration file again").unwrap();
        let c = embedder.embed("unrelated words entirely different").unwrap();

        let dot = |x: &[f32], y: &[f32]| -> f32 { x.iter().zip(y).map(|(p, q)| p * q).sum() };
        assert!(dot(&a, &b) > dot(&a, &c));
    }
}
