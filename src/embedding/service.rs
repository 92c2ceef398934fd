//! Shared embedding facade.

use std::sync::Arc;

use crate::embedding::cache::{CacheStats, CachedEmbeddingProvider, EmbeddingCacheConfig};
use crate::embedding::similarity::checked_cosine_similarity;
use crate::embedding::traits::EmbeddingProvider;
use crate::error::EmbeddingError;
use crate::types::Plausibility;

/// The best-scoring candidate of a semantic search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticMatch<'a> {
    /// The candidate text.
    pub name: &'a str,
    /// Cosine similarity to the query.
    pub similarity: f32,
}

/// Text to vector, plus cosine similarity.
///
/// Constructed explicitly and shared through `Arc` by every component that
/// needs embeddings, so one cache serves a whole process.
#[derive(Clone)]
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingService {
    /// Wrap an already shared provider.
    #[must_use]
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Wrap a provider without caching.
    #[must_use]
    pub fn uncached<P: EmbeddingProvider + 'static>(provider: P) -> Self {
        Self::new(Arc::new(provider))
    }

    /// Wrap a provider in a bounded LRU cache.
    #[must_use]
    pub fn cached<P: EmbeddingProvider + 'static>(
        provider: P,
        config: EmbeddingCacheConfig,
    ) -> Self {
        Self::new(Arc::new(CachedEmbeddingProvider::new(provider, config)))
    }

    /// Embed a text.
    ///
    /// # Errors
    ///
    /// Propagates the provider's error.
    pub async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.provider.embed(text).await
    }

    /// Cosine similarity of two vectors, in `[-1, 1]`.
    ///
    /// # Errors
    ///
    /// Returns an error when the dimensions differ.
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> Result<f32, EmbeddingError> {
        checked_cosine_similarity(a, b)
    }

    /// Embed two texts and compare them.
    ///
    /// # Errors
    ///
    /// Propagates embedding failures.
    pub async fn text_similarity(&self, a: &str, b: &str) -> Result<f32, EmbeddingError> {
        let va = self.encode(a).await?;
        let vb = self.encode(b).await?;
        self.similarity(&va, &vb)
    }

    /// Find the candidate most similar to `query`.
    ///
    /// Only strictly positive similarities count; `None` means no candidate
    /// scored above zero. Ties keep the earlier candidate.
    ///
    /// # Errors
    ///
    /// Propagates embedding failures.
    pub async fn best_match<'a, I>(
        &self,
        query: &str,
        candidates: I,
    ) -> Result<Option<SemanticMatch<'a>>, EmbeddingError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let query_vec = self.encode(query).await?;
        let mut best: Option<SemanticMatch<'a>> = None;

        for name in candidates {
            let candidate_vec = self.encode(name).await?;
            let similarity = self.similarity(&query_vec, &candidate_vec)?;
            if similarity > best.map_or(0.0, |m| m.similarity) {
                best = Some(SemanticMatch { name, similarity });
            }
        }

        Ok(best)
    }

    /// How well `entity` fits the text around it. Embedding failures give
    /// [`Plausibility::Unknown`].
    pub async fn plausibility(&self, entity: &str, window: &str) -> Plausibility {
        match self.text_similarity(entity, window).await {
            Ok(score) => Plausibility::Score(score),
            Err(err) => {
                tracing::warn!(entity, error = %err, "plausibility unavailable");
                Plausibility::Unknown
            }
        }
    }

    /// The provider's model identifier.
    #[must_use]
    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    /// The provider's embedding dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Cache statistics, when the provider caches.
    #[must_use]
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.provider.cache_stats()
    }
}

impl std::fmt::Debug for EmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingService")
            .field("model_id", &self.provider.model_id())
            .field("dimension", &self.provider.dimension())
            .finish()
    }
}
