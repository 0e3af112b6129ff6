//! In-memory index with file-backed persistence.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::ArtifactPaths;
use crate::index::artifacts::{
    EmbeddingsArtifact, SourceIndexArtifact, read_json_opt, write_json,
};
use crate::types::{Fragment, IndexedFragment, RetrievalError, SourceKind};

/// Process-wide retrieval index.
///
/// Constructed once at startup and injected wherever it is read or
/// written; there is no ambient global. Reads take a snapshot so an
/// in-flight search always sees a consistent view; writes (load, the
/// replace operations, clear) hold the write lock and are expected to run
/// at maintenance points, not concurrently with each other.
pub struct IndexStore {
    paths: ArtifactPaths,
    entries: RwLock<Vec<IndexedFragment>>,
}

impl IndexStore {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Rebuilds the in-memory index from the persisted artifacts.
    ///
    /// Each artifact is optional: a missing or corrupt file contributes
    /// nothing and the load continues, so a partial set of artifacts
    /// yields a partial (keyword-searchable) index rather than a failure.
    pub async fn load(&self) -> Result<usize, RetrievalError> {
        let mut loaded = Vec::new();

        if let Some(artifact) =
            read_json_opt::<SourceIndexArtifact>(&self.paths.drive_index).await
        {
            loaded.extend(pair_entries(artifact));
        }

        if let Some(artifact) =
            read_json_opt::<SourceIndexArtifact>(&self.paths.guide_fragments).await
        {
            let mut guide_entries = pair_entries(artifact);
            if let Some(embeddings) =
                read_json_opt::<EmbeddingsArtifact>(&self.paths.guide_embeddings).await
            {
                attach_by_id(&mut guide_entries, &embeddings.embeddings);
            }
            loaded.extend(guide_entries);
        }

        let count = loaded.len();
        let embedded = loaded.iter().filter(|e| e.has_embedding()).count();
        info!(fragments = count, embedded, "index loaded");
        *self.entries.write() = loaded;
        Ok(count)
    }

    /// Persists the drive-source entries. The guide source is persisted
    /// by its own indexing pass and only re-loaded here.
    pub async fn save(&self) -> Result<(), RetrievalError> {
        let drive_entries = self.entries_of(SourceKind::DriveDocument);
        let artifact = to_artifact(&drive_entries);
        write_json(&self.paths.drive_index, &artifact).await?;
        info!(
            path = %self.paths.drive_index.display(),
            fragments = drive_entries.len(),
            "saved drive index artifact"
        );
        Ok(())
    }

    /// Empties the index and persists the empty state, so a stale index
    /// cannot silently reload on restart.
    pub async fn clear(&self) -> Result<(), RetrievalError> {
        self.entries.write().clear();
        let empty = to_artifact(&[]);
        write_json(&self.paths.drive_index, &empty).await?;
        let empty = to_artifact(&[]);
        write_json(&self.paths.guide_fragments, &empty).await?;
        info!("cleared index and persisted empty state");
        Ok(())
    }

    /// Replaces every entry of the fragments' source kind.
    ///
    /// Vectors are paired by fragment id; fragments without a vector stay
    /// indexed for keyword scoring. Whole-source replacement keeps the
    /// two sources independently refreshable.
    pub fn replace_source(
        &self,
        kind: SourceKind,
        fragments: Vec<Fragment>,
        vectors: &HashMap<String, Vec<f32>>,
    ) {
        let mut incoming: Vec<IndexedFragment> = fragments
            .into_iter()
            .map(|fragment| {
                let embedding = vectors.get(&fragment.id).cloned();
                IndexedFragment::new(fragment, embedding)
            })
            .collect();

        for entry in &incoming {
            if entry.fragment.source_kind() != kind {
                warn!(
                    fragment = %entry.fragment.id,
                    "fragment source kind does not match replacement kind"
                );
            }
        }

        let mut entries = self.entries.write();
        entries.retain(|entry| entry.fragment.source_kind() != kind);
        entries.append(&mut incoming);
    }

    /// Re-pairs vectors onto existing entries of one source kind, used
    /// after a separate embedding pass for the scraped source.
    pub fn attach_embeddings(&self, kind: SourceKind, vectors: &HashMap<String, Vec<f32>>) {
        let mut entries = self.entries.write();
        for entry in entries.iter_mut() {
            if entry.fragment.source_kind() == kind {
                if let Some(vector) = vectors.get(&entry.fragment.id) {
                    entry.embedding = Some(vector.clone()).filter(|v| !v.is_empty());
                }
            }
        }
    }

    /// Consistent view of the index for one search call.
    pub fn snapshot(&self) -> Vec<IndexedFragment> {
        self.entries.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn embedded_count(&self) -> usize {
        self.entries.read().iter().filter(|e| e.has_embedding()).count()
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    fn entries_of(&self, kind: SourceKind) -> Vec<IndexedFragment> {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.fragment.source_kind() == kind)
            .cloned()
            .collect()
    }
}

/// Re-pairs an artifact's parallel arrays into indexed entries. A short
/// or absent vectors array loads as missing embeddings, never a skew.
fn pair_entries(artifact: SourceIndexArtifact) -> Vec<IndexedFragment> {
    let SourceIndexArtifact {
        fragments, vectors, ..
    } = artifact;
    let mut vectors = vectors.into_iter();
    fragments
        .into_iter()
        .map(|fragment| {
            let embedding = vectors.next().filter(|v| !v.is_empty());
            IndexedFragment::new(fragment, embedding)
        })
        .collect()
}

fn attach_by_id(entries: &mut [IndexedFragment], vectors: &HashMap<String, Vec<f32>>) {
    for entry in entries.iter_mut() {
        if let Some(vector) = vectors.get(&entry.fragment.id) {
            entry.embedding = Some(vector.clone()).filter(|v| !v.is_empty());
        }
    }
}

fn to_artifact(entries: &[IndexedFragment]) -> SourceIndexArtifact {
    let total_documents = entries
        .iter()
        .map(|entry| entry.fragment.document_id.as_str())
        .collect::<std::collections::HashSet<_>>()
        .len();
    SourceIndexArtifact {
        fragments: entries.iter().map(|e| e.fragment.clone()).collect(),
        vectors: entries
            .iter()
            .map(|e| e.embedding.clone().unwrap_or_default())
            .collect(),
        indexed_at: Utc::now(),
        total_documents,
    }
}
