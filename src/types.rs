//! Core data model and error types shared across the crate.

use serde::{Deserialize, Serialize};

/// Unified error type for retrieval operations.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// A source connector (document store or documentation site) failed.
    #[error("connector failure: {0}")]
    Connector(String),

    /// The embedding service rejected a request or returned malformed data.
    #[error("embedding failure: {0}")]
    Embedding(String),

    /// Reading or writing a persisted index artifact failed.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Chunking produced no usable output or hit an internal limit.
    #[error("chunking failure: {0}")]
    Chunking(String),

    /// A source document could not be interpreted.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A query was issued against an index with no fragments.
    ///
    /// Distinct from a query that matches nothing, which is a valid
    /// empty result.
    #[error("nothing indexed: run an indexing pass before searching")]
    EmptyIndex,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Originating collaborator of a fragment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Office-style documents from the cloud document repository.
    DriveDocument,
    /// Pages scraped from the documentation site.
    ScrapedPage,
}

/// Source-specific metadata carried by each fragment.
///
/// Adding a third source means adding one variant here plus its scoring
/// and display arms; the merge logic never branches on source strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FragmentSource {
    Drive {
        #[serde(skip_serializing_if = "Option::is_none")]
        parent_folder: Option<String>,
    },
    Guide {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        section: Option<String>,
        #[serde(default)]
        topics: Vec<String>,
    },
}

impl FragmentSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            FragmentSource::Drive { .. } => SourceKind::DriveDocument,
            FragmentSource::Guide { .. } => SourceKind::ScrapedPage,
        }
    }

    /// Topic tags eligible for keyword scoring. Only scraped pages carry
    /// topics; drive documents contribute nothing here.
    pub fn topics(&self) -> &[String] {
        match self {
            FragmentSource::Drive { .. } => &[],
            FragmentSource::Guide { topics, .. } => topics,
        }
    }

    pub fn parent_folder(&self) -> Option<&str> {
        match self {
            FragmentSource::Drive { parent_folder } => parent_folder.as_deref(),
            FragmentSource::Guide { section, .. } => section.as_deref(),
        }
    }
}

/// The atomic unit of retrieval: a bounded slice of a source document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Unique id derived from `(document_id, position)`.
    pub id: String,
    /// Normalized fragment text.
    pub content: String,
    /// Stable identifier of the owning document.
    pub document_id: String,
    /// Display name of the owning document.
    pub document_name: String,
    /// Zero-based reading-order position within the document.
    pub position: usize,
    /// Number of fragments the document produced, for diagnostics.
    pub total_in_document: usize,
    pub source: FragmentSource,
}

impl Fragment {
    /// Builds the canonical fragment id for a document position.
    pub fn fragment_id(document_id: &str, position: usize) -> String {
        format!("{document_id}-fragment-{position}")
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }
}

/// A fragment paired with its embedding, the unit the index stores.
///
/// Embedding coverage is partial by design: `None` means the fragment is
/// only reachable through keyword scoring until an embedding pass runs.
/// Pairing the two in one record makes desynchronized parallel arrays
/// unrepresentable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexedFragment {
    pub fragment: Fragment,
    pub embedding: Option<Vec<f32>>,
}

impl IndexedFragment {
    pub fn new(fragment: Fragment, embedding: Option<Vec<f32>>) -> Self {
        Self {
            fragment,
            embedding: embedding.filter(|v| !v.is_empty()),
        }
    }

    pub fn has_embedding(&self) -> bool {
        self.embedding.as_ref().is_some_and(|v| !v.is_empty())
    }
}

/// Per-query, document-level result returned to the answering caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub document_id: String,
    pub document_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_folder: Option<String>,
    /// Contributing fragment contents, space-joined in similarity order.
    pub content: String,
    /// Comparable across sources: cosine similarity for the vector phase,
    /// normalized keyword tally for the fallback phase.
    pub similarity: f32,
    pub source_kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
}
