//! Embedding cache with LRU eviction.
//!
//! Embedding computation dominates verification cost: the same category names
//! are embedded for every claim of every request. This wrapper keeps the most
//! recently used vectors, keyed by the exact input text.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding::traits::EmbeddingProvider;
use crate::error::EmbeddingError;

/// Configuration for the embedding cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingCacheConfig {
    /// Maximum number of entries in the cache.
    pub max_entries: usize,
    /// Whether to track cache statistics.
    pub track_stats: bool,
}

impl Default for EmbeddingCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1024,
            track_stats: true,
        }
    }
}

impl EmbeddingCacheConfig {
    /// Create a new cache configuration.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            track_stats: true,
        }
    }

    /// Set whether to track cache statistics.
    #[must_use]
    pub fn with_stats_tracking(mut self, track: bool) -> Self {
        self.track_stats = track;
        self
    }
}

/// Statistics for the embedding cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of evictions.
    pub evictions: u64,
    /// Current number of entries.
    pub entries: usize,
}

impl CacheStats {
    /// Calculate the hit rate as a percentage.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            {
                (self.hits as f64 / total as f64) * 100.0
            }
        }
    }
}

/// Entries plus a recency index: `order` maps each entry's last-use tick
/// back to its key, so the first key in `order` is the eviction victim.
#[derive(Default)]
struct Lru {
    entries: HashMap<String, (Vec<f32>, u64)>,
    order: BTreeMap<u64, String>,
    clock: u64,
}

impl Lru {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn touch(&mut self, text: &str) -> Option<Vec<f32>> {
        let now = self.tick();
        let (embedding, last) = self.entries.get_mut(text)?;
        let previous = std::mem::replace(last, now);
        self.order.remove(&previous);
        self.order.insert(now, text.to_string());
        Some(embedding.clone())
    }

    /// Insert or refresh `text`, returning how many entries were evicted.
    fn put(&mut self, text: &str, embedding: Vec<f32>, capacity: usize) -> u64 {
        let mut evicted = 0;
        if let Some((_, last)) = self.entries.remove(text) {
            self.order.remove(&last);
        } else {
            while self.entries.len() >= capacity {
                let Some((_, victim)) = self.order.pop_first() else {
                    break;
                };
                self.entries.remove(&victim);
                evicted += 1;
            }
        }
        let now = self.tick();
        self.order.insert(now, text.to_string());
        self.entries.insert(text.to_string(), (embedding, now));
        evicted
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// A caching wrapper for embedding providers with LRU eviction.
pub struct CachedEmbeddingProvider<P: EmbeddingProvider> {
    provider: P,
    config: EmbeddingCacheConfig,
    lru: RwLock<Lru>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<P: EmbeddingProvider> CachedEmbeddingProvider<P> {
    /// Create a new cached embedding provider.
    #[must_use]
    pub fn new(provider: P, config: EmbeddingCacheConfig) -> Self {
        Self {
            provider,
            config,
            lru: RwLock::new(Lru::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Create a cached provider with default configuration.
    #[must_use]
    pub fn with_defaults(provider: P) -> Self {
        Self::new(provider, EmbeddingCacheConfig::default())
    }

    /// Get the underlying provider.
    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let entries = self
            .lru
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries,
        }
    }

    /// Drop every cached vector. Statistics are kept.
    pub fn clear_cache(&self) {
        self.lru
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn count(&self, counter: &AtomicU64, n: u64) {
        if self.config.track_stats && n > 0 {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }

    fn lookup(&self, text: &str) -> Option<Vec<f32>> {
        let found = self
            .lru
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .touch(text);
        if found.is_some() {
            self.count(&self.hits, 1);
        } else {
            self.count(&self.misses, 1);
        }
        found
    }

    fn store(&self, text: &str, embedding: Vec<f32>) {
        let evicted = self
            .lru
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .put(text, embedding, self.config.max_entries.max(1));
        self.count(&self.evictions, evicted);
    }
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for CachedEmbeddingProvider<P> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if let Some(embedding) = self.lookup(text) {
            return Ok(embedding);
        }

        let embedding = self.provider.embed(text).await?;
        self.store(text, embedding.clone());
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut results: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut uncached_indices: Vec<usize> = Vec::new();
        let mut uncached_texts: Vec<&str> = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            if let Some(embedding) = self.lookup(text) {
                results[i] = Some(embedding);
            } else {
                uncached_indices.push(i);
                uncached_texts.push(text);
            }
        }

        if !uncached_texts.is_empty() {
            let new_embeddings = self.provider.embed_batch(&uncached_texts).await?;
            if new_embeddings.len() != uncached_texts.len() {
                return Err(EmbeddingError::Backend(format!(
                    "provider returned {} embeddings for {} texts",
                    new_embeddings.len(),
                    uncached_texts.len()
                )));
            }
            for (i, embedding) in uncached_indices.into_iter().zip(new_embeddings) {
                self.store(texts[i], embedding.clone());
                results[i] = Some(embedding);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    fn cache_stats(&self) -> Option<CacheStats> {
        Some(self.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;

    #[tokio::test]
    async fn test_cache_hit() {
        let cached = CachedEmbeddingProvider::with_defaults(MockEmbeddingProvider::new(64));

        let emb1 = cached.embed("Dining").await.unwrap();
        assert_eq!(cached.stats().hits, 0);
        assert_eq!(cached.stats().misses, 1);

        let emb2 = cached.embed("Dining").await.unwrap();
        assert_eq!(cached.stats().hits, 1);
        assert_eq!(cached.stats().misses, 1);
        assert_eq!(emb1, emb2);
    }

    #[tokio::test]
    async fn test_cache_lru_eviction() {
        let config = EmbeddingCacheConfig::new(3);
        let cached = CachedEmbeddingProvider::new(MockEmbeddingProvider::new(32), config);

        cached.embed("Dining").await.unwrap();
        cached.embed("Groceries").await.unwrap();
        cached.embed("Travel").await.unwrap();

        // Touch "Dining" so "Groceries" becomes least recently used.
        cached.embed("Dining").await.unwrap();
        cached.embed("Utilities").await.unwrap();

        let stats = cached.stats();
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.evictions, 1);

        cached.embed("Dining").await.unwrap();
        assert_eq!(cached.stats().hits, 2);
        cached.embed("Groceries").await.unwrap();
        assert_eq!(cached.stats().misses, 5);
    }

    #[tokio::test]
    async fn test_reinsert_does_not_evict() {
        let config = EmbeddingCacheConfig::new(1);
        let cached = CachedEmbeddingProvider::new(MockEmbeddingProvider::new(16), config);
        cached.embed("Dining").await.unwrap();
        cached.store("Dining", vec![0.0; 16]);
        assert_eq!(cached.stats().evictions, 0);
    }

    #[tokio::test]
    async fn test_batch_mixes_cached_and_fresh() {
        let cached = CachedEmbeddingProvider::with_defaults(MockEmbeddingProvider::new(16));
        let first = cached.embed("Dining").await.unwrap();

        let batch = cached.embed_batch(&["Travel", "Dining"]).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], first);
        assert_eq!(cached.stats().entries, 2);
    }

    #[tokio::test]
    async fn test_stats_disabled() {
        let config = EmbeddingCacheConfig::new(8).with_stats_tracking(false);
        let cached = CachedEmbeddingProvider::new(MockEmbeddingProvider::new(16), config);
        cached.embed("Dining").await.unwrap();
        cached.embed("Dining").await.unwrap();
        let stats = cached.stats();
        assert_eq!(stats.hits + stats.misses, 0);
        assert!(stats.hit_rate().abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let cached = CachedEmbeddingProvider::with_defaults(MockEmbeddingProvider::new(16));
        cached.embed("Dining").await.unwrap();
        cached.clear_cache();
        assert_eq!(cached.stats().entries, 0);
        assert!(cached.cache_stats().is_some());
    }
}
