//! Two-phase hybrid search over the in-memory index.
//!
//! The vector phase ranks embedded fragments by cosine similarity against
//! the embedded query; the keyword phase scores fragments that never got a
//! vector so they stay reachable. Each phase aggregates to documents and
//! offers up to `top_k` candidates, so a single source can fill the whole
//! result set; the merged list is re-sorted by similarity and truncated to
//! `top_k`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::KeywordWeights;
use crate::embeddings::{EmbeddingProvider, embed_query};
use crate::index::IndexStore;
use crate::search::aggregate::{DocumentHit, ScoredFragment, aggregate};
use crate::search::keyword::{normalize_score, query_words, score_fragment};
use crate::types::{IndexedFragment, RetrievalError, SearchResult, SourceKind};

pub struct HybridSearch {
    store: Arc<IndexStore>,
    provider: Arc<dyn EmbeddingProvider>,
    weights: KeywordWeights,
}

impl HybridSearch {
    pub fn new(store: Arc<IndexStore>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            provider,
            weights: KeywordWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: KeywordWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Runs both phases and returns at most `top_k` document-level results.
    ///
    /// An empty index is an error so callers can distinguish "nothing
    /// indexed yet" from "no document matched". A failed query embedding
    /// degrades to keyword-only scoring over the whole index rather than
    /// failing the search.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, RetrievalError> {
        if self.store.is_empty() {
            return Err(RetrievalError::EmptyIndex);
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let snapshot = self.store.snapshot();

        let query_vector = match embed_query(self.provider.as_ref(), query).await {
            Ok(vector) => Some(vector),
            Err(err) => {
                warn!(error = %err, "query embedding failed, keyword phase only");
                None
            }
        };

        let (embedded, unembedded): (Vec<_>, Vec<_>) = snapshot
            .into_iter()
            .partition(|entry| entry.has_embedding() && query_vector.is_some());

        let mut merged: Vec<DocumentHit> = Vec::new();
        if let Some(vector) = &query_vector {
            // Each source is ranked on its own so a large scraped corpus
            // cannot crowd the drive documents out before the merge.
            for kind in [SourceKind::DriveDocument, SourceKind::ScrapedPage] {
                merged.extend(vector_phase(&embedded, kind, vector, top_k));
            }
        }
        merged.extend(keyword_phase(&unembedded, query, &self.weights, top_k));

        merged.sort_by(|a, b| {
            b.result
                .similarity
                .partial_cmp(&a.result.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.result.document_id.cmp(&b.result.document_id))
        });
        merged.truncate(top_k);

        debug!(query, results = merged.len(), "hybrid search complete");
        Ok(merged.into_iter().map(|hit| hit.result).collect())
    }
}

fn vector_phase(
    entries: &[IndexedFragment],
    kind: SourceKind,
    query_vector: &[f32],
    top_k: usize,
) -> Vec<DocumentHit> {
    let mut hits: Vec<ScoredFragment> = entries
        .iter()
        .filter(|entry| entry.fragment.source_kind() == kind)
        .filter_map(|entry| {
            let embedding = entry.embedding.as_deref()?;
            Some(ScoredFragment {
                fragment: entry.fragment.clone(),
                similarity: cosine_similarity(query_vector, embedding),
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(top_k);

    // At most `top_k` fragments went in, so at most `top_k` documents come
    // out; the final merge does the cross-source truncation.
    aggregate(hits)
}

fn keyword_phase(
    entries: &[IndexedFragment],
    query: &str,
    weights: &KeywordWeights,
    top_k: usize,
) -> Vec<DocumentHit> {
    let words = query_words(query);
    if words.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(u32, &IndexedFragment)> = entries
        .iter()
        .map(|entry| (score_fragment(&words, &entry.fragment, weights), entry))
        .filter(|(raw, _)| *raw > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.truncate(top_k);

    let hits: Vec<ScoredFragment> = scored
        .into_iter()
        .map(|(raw, entry)| ScoredFragment {
            fragment: entry.fragment.clone(),
            similarity: normalize_score(raw, weights),
        })
        .collect();

    aggregate(hits)
}

/// Cosine similarity of two vectors. Mismatched lengths or a zero-norm
/// operand score 0.0 rather than erroring, so one malformed embedding
/// cannot take down a whole search.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
