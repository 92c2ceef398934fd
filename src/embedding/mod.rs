//! Text embeddings: provider trait, LRU cache, mock provider and the
//! [`EmbeddingService`] facade the verifier components share.

mod cache;
mod mock;
mod service;
mod similarity;
mod traits;

pub use cache::{CacheStats, CachedEmbeddingProvider, EmbeddingCacheConfig};
pub use mock::MockEmbeddingProvider;
pub use service::{EmbeddingService, SemanticMatch};
pub use similarity::{checked_cosine_similarity, cosine_similarity};
pub use traits::EmbeddingProvider;
