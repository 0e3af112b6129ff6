//! Embedding providers and the batched generation run.
//!
//! * [`EmbeddingProvider`]: the service seam: batched text-in, vectors-out.
//! * [`HttpEmbeddingProvider`]: hosted embedding service over HTTP.
//! * [`MockEmbeddingProvider`]: deterministic vectors for tests.
//! * [`generator`]: wave-parallel batch submission with failure isolation.

pub mod generator;
pub mod http;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::types::RetrievalError;

pub use generator::{EmbeddingGenerator, EmbeddingRun};
pub use http::HttpEmbeddingProvider;

/// A hosted model that turns texts into fixed-length vectors.
///
/// One provider maps to one model identifier and one dimensionality; the
/// generator and search layers never assume more than that.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a batch of texts, returning one vector per input in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError>;

    /// Model identifier recorded in persisted artifacts.
    fn model_id(&self) -> &str;
}

/// Convenience for the single-text query path.
pub async fn embed_query(
    provider: &dyn EmbeddingProvider,
    query: &str,
) -> Result<Vec<f32>, RetrievalError> {
    let mut vectors = provider.embed_batch(&[query.to_string()]).await?;
    vectors
        .pop()
        .ok_or_else(|| RetrievalError::Embedding("service returned no vector for query".into()))
}

/// Deterministic, dependency-free provider for tests and offline demos.
///
/// Vectors are derived from a content hash: identical text yields an
/// identical vector, similar text does not, which is enough to exercise
/// ranking plumbing without a live service.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimensions: 16 }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = Vec::with_capacity(self.dimensions);
        for lane in 0..self.dimensions {
            let mut hasher = DefaultHasher::new();
            lane.hash(&mut hasher);
            text.hash(&mut hasher);
            let raw = hasher.finish();
            // Map the hash onto [-1, 1].
            vector.push((raw as f64 / u64::MAX as f64 * 2.0 - 1.0) as f32);
        }
        vector
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }

    fn model_id(&self) -> &str {
        "mock-embedding"
    }
}
