//! Deterministic embedding provider for tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use crate::embedding::traits::EmbeddingProvider;
use crate::error::EmbeddingError;

/// A mock embedding provider.
///
/// Unrelated texts map to pseudo-random unit vectors, which are nearly
/// orthogonal at realistic dimensions. Tests pin semantic relations with
/// [`with_vector`](Self::with_vector) (exact text) and
/// [`with_alias`](Self::with_alias) (any text containing a phrase embeds
/// like a canonical text).
pub struct MockEmbeddingProvider {
    dimension: usize,
    model_id: String,
    vectors: HashMap<String, Vec<f32>>,
    aliases: Vec<(String, String)>,
    failing: AtomicBool,
    calls: AtomicU64,
}

impl MockEmbeddingProvider {
    /// Create a new mock embedding provider.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_id: "mock-embedding-model".to_string(),
            vectors: HashMap::new(),
            aliases: Vec::new(),
            failing: AtomicBool::new(false),
            calls: AtomicU64::new(0),
        }
    }

    /// Set the model ID.
    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Pin the embedding of an exact text. The vector is normalized.
    #[must_use]
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), normalize(vector));
        self
    }

    /// Any text containing `phrase` (case-insensitive) embeds exactly like
    /// `canonical`. Aliases are tried in insertion order.
    #[must_use]
    pub fn with_alias(mut self, phrase: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.aliases
            .push((phrase.into().to_lowercase(), canonical.into()));
        self
    }

    /// Make every subsequent call fail with a backend error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Number of `embed` calls served.
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn resolve<'a>(&'a self, text: &'a str) -> &'a str {
        if self.vectors.contains_key(text) {
            return text;
        }
        let lowered = text.to_lowercase();
        self.aliases
            .iter()
            .find(|(phrase, _)| lowered.contains(phrase.as_str()))
            .map_or(text, |(_, canonical)| canonical.as_str())
    }

    fn hash_to_embedding(&self, text: &str) -> Vec<f32> {
        // FNV-1a seed, splitmix64 stream.
        let mut state = text.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });

        let mut embedding = Vec::with_capacity(self.dimension);
        for _ in 0..self.dimension {
            state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
            let mut z = state;
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
            z ^= z >> 31;
            #[allow(clippy::cast_precision_loss)]
            let value = ((z % 20_001) as f32 / 10_000.0) - 1.0;
            embedding.push(value);
        }
        normalize(embedding)
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new(128)
    }
}

fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.failing.load(Ordering::Relaxed) {
            return Err(EmbeddingError::Backend("mock provider set to fail".into()));
        }
        if text.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let key = self.resolve(text);
        if let Some(vector) = self.vectors.get(key) {
            if vector.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
            return Ok(vector.clone());
        }
        Ok(self.hash_to_embedding(key))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[tokio::test]
    async fn test_deterministic_and_normalized() {
        let provider = MockEmbeddingProvider::new(64);
        let a = provider.embed("Dining").await.unwrap();
        let b = provider.embed("Dining").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_unrelated_texts_are_dissimilar() {
        let provider = MockEmbeddingProvider::new(128);
        let a = provider.embed("Netflix").await.unwrap();
        let b = provider.embed("Dining").await.unwrap();
        assert!(cosine_similarity(&a, &b).abs() < 0.5);
    }

    #[tokio::test]
    async fn test_alias_embeds_like_canonical() {
        let provider = MockEmbeddingProvider::new(32).with_alias("eating out", "Dining");
        let a = provider.embed("Eating out was expensive").await.unwrap();
        let b = provider.embed("Dining").await.unwrap();
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_pinned_vector() {
        let provider = MockEmbeddingProvider::new(2).with_vector("Dining", vec![3.0, 4.0]);
        let v = provider.embed("Dining").await.unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_failure_modes() {
        let provider = MockEmbeddingProvider::new(8);
        assert!(matches!(
            provider.embed("").await,
            Err(EmbeddingError::EmptyInput)
        ));
        provider.set_failing(true);
        assert!(matches!(
            provider.embed("Dining").await,
            Err(EmbeddingError::Backend(_))
        ));
        assert_eq!(provider.calls(), 2);

        let mismatched = MockEmbeddingProvider::new(8).with_vector("x", vec![1.0, 0.0]);
        assert!(matches!(
            mismatched.embed("x").await,
            Err(EmbeddingError::DimensionMismatch { expected: 8, actual: 2 })
        ));
    }
}
