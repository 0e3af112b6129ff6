//! Grouping fragment-level hits back into document-level results.

use crate::types::{Fragment, FragmentSource, SearchResult};

/// One fragment with its per-query score, the unit both search phases
/// produce before aggregation.
#[derive(Clone, Debug)]
pub struct ScoredFragment {
    pub fragment: Fragment,
    pub similarity: f32,
}

/// A document-level hit: the caller-facing result plus the summed score
/// used for ranking documents within a phase.
#[derive(Clone, Debug)]
pub struct DocumentHit {
    pub total_score: f32,
    pub result: SearchResult,
}

/// Groups ranked fragments into one entry per document.
///
/// Expects `hits` sorted by similarity descending. Contents are joined in
/// similarity order (a deliberate simplification, not reading order); the
/// reported similarity is the average over contributing fragments, and
/// display metadata comes from the highest-scoring fragment. Output is
/// ordered by summed score descending with `document_id` breaking ties.
pub fn aggregate(hits: Vec<ScoredFragment>) -> Vec<DocumentHit> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: std::collections::HashMap<String, Vec<ScoredFragment>> =
        std::collections::HashMap::new();

    for hit in hits {
        let key = hit.fragment.document_id.clone();
        if !grouped.contains_key(&key) {
            order.push(key.clone());
        }
        grouped.entry(key).or_default().push(hit);
    }

    let mut documents: Vec<DocumentHit> = order
        .into_iter()
        .map(|document_id| {
            let fragments = grouped.remove(&document_id).unwrap_or_default();
            document_hit(document_id, fragments)
        })
        .collect();

    documents.sort_by(|a, b| {
        b.total_score
            .partial_cmp(&a.total_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.result.document_id.cmp(&b.result.document_id))
    });
    documents
}

fn document_hit(document_id: String, fragments: Vec<ScoredFragment>) -> DocumentHit {
    let total_score: f32 = fragments.iter().map(|f| f.similarity).sum();
    let average = if fragments.is_empty() {
        0.0
    } else {
        total_score / fragments.len() as f32
    };

    let content = fragments
        .iter()
        .map(|f| f.fragment.content.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    // Richest display metadata: the strongest fragment wins. `fragments`
    // arrives in similarity order, so that is the first one.
    let best = &fragments[0].fragment;
    let (url, section, topics) = match &best.source {
        FragmentSource::Drive { .. } => (None, None, Vec::new()),
        FragmentSource::Guide {
            url,
            section,
            topics,
        } => (Some(url.clone()), section.clone(), topics.clone()),
    };

    DocumentHit {
        total_score,
        result: SearchResult {
            document_id,
            document_name: best.document_name.clone(),
            parent_folder: best.source.parent_folder().map(str::to_string),
            content,
            similarity: average,
            source_kind: best.source_kind(),
            url,
            section,
            topics,
        },
    }
}
