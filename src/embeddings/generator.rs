//! Wave-parallel embedding generation with per-batch failure isolation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::EmbeddingConfig;
use crate::index::artifacts::{EmbeddingsArtifact, EmbeddingsMetadata, write_json};
use crate::types::{Fragment, RetrievalError};

use super::EmbeddingProvider;

/// Outcome of one generation run.
#[derive(Debug)]
pub struct EmbeddingRun {
    /// Successful vectors keyed by fragment id.
    pub vectors: HashMap<String, Vec<f32>>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl EmbeddingRun {
    pub fn dimensions(&self) -> usize {
        self.vectors.values().next().map_or(0, Vec::len)
    }
}

/// Submits fragments to the embedding service in fixed-size batches,
/// several batches per wave, with a pause between waves.
pub struct EmbeddingGenerator {
    provider: Arc<dyn EmbeddingProvider>,
    config: EmbeddingConfig,
}

impl EmbeddingGenerator {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: EmbeddingConfig) -> Self {
        Self { provider, config }
    }

    /// Embeds every fragment, tolerating batch-level failures.
    ///
    /// A failed batch marks only its own fragments failed; remaining
    /// batches still run. Merging happens between waves on the calling
    /// task, so no accumulator is shared across concurrent batches.
    pub async fn run(&self, fragments: &[Fragment]) -> EmbeddingRun {
        let start = Instant::now();
        let batches: Vec<&[Fragment]> = fragments.chunks(self.config.batch_size.max(1)).collect();
        info!(
            fragments = fragments.len(),
            batches = batches.len(),
            concurrency = self.config.max_concurrent_batches,
            model = self.provider.model_id(),
            "starting embedding run"
        );

        let mut vectors = HashMap::new();
        let mut failed = 0usize;

        let waves: Vec<&[&[Fragment]]> = batches
            .chunks(self.config.max_concurrent_batches.max(1))
            .collect();
        let wave_count = waves.len();

        for (wave_index, wave) in waves.into_iter().enumerate() {
            let outcomes = join_all(wave.iter().map(|batch| self.embed_batch(batch))).await;

            for outcome in outcomes {
                match outcome {
                    Ok(pairs) => vectors.extend(pairs),
                    Err((batch_len, err)) => {
                        warn!(error = %err, fragments = batch_len, "batch failed, continuing");
                        failed += batch_len;
                    }
                }
            }

            if wave_index + 1 < wave_count {
                sleep(self.config.wave_delay).await;
            }
        }

        let elapsed = start.elapsed();
        let succeeded = vectors.len();
        let per_second = if elapsed.as_secs_f64() > 0.0 {
            succeeded as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        info!(
            total = fragments.len(),
            succeeded,
            failed,
            elapsed_ms = elapsed.as_millis() as u64,
            throughput = format!("{per_second:.1}/s"),
            "embedding run complete"
        );

        EmbeddingRun {
            vectors,
            total: fragments.len(),
            succeeded,
            failed,
            elapsed,
        }
    }

    async fn embed_batch(
        &self,
        batch: &[Fragment],
    ) -> Result<Vec<(String, Vec<f32>)>, (usize, RetrievalError)> {
        let texts: Vec<String> = batch.iter().map(|f| f.content.clone()).collect();
        let embedded = self
            .provider
            .embed_batch(&texts)
            .await
            .map_err(|err| (batch.len(), err))?;
        if embedded.len() != batch.len() {
            return Err((
                batch.len(),
                RetrievalError::Embedding(format!(
                    "service returned {} vectors for {} fragments",
                    embedded.len(),
                    batch.len()
                )),
            ));
        }
        Ok(batch
            .iter()
            .map(|f| f.id.clone())
            .zip(embedded)
            .collect())
    }

    /// Persists the run's vectors plus metadata, replacing any prior file
    /// for this source wholesale. Re-running never merges old and new
    /// vectors.
    pub async fn persist(
        &self,
        path: impl AsRef<Path>,
        run: &EmbeddingRun,
    ) -> Result<(), RetrievalError> {
        let artifact = EmbeddingsArtifact {
            metadata: EmbeddingsMetadata {
                model: self.provider.model_id().to_string(),
                dimensions: run.dimensions(),
                generated_at: chrono::Utc::now(),
                total_fragments: run.total,
                successful: run.succeeded,
            },
            embeddings: run.vectors.clone(),
        };
        write_json(path.as_ref(), &artifact).await?;
        info!(
            path = %path.as_ref().display(),
            vectors = run.succeeded,
            "persisted embeddings artifact"
        );
        Ok(())
    }
}
