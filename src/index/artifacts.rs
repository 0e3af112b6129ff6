//! Persisted index artifacts: JSON documents, one per source.
//!
//! The wire shape keeps fragments and vectors as parallel arrays (a
//! missing vector is an empty array) so each artifact stays loadable on
//! its own; in memory the store immediately re-pairs them into
//! [`IndexedFragment`](crate::types::IndexedFragment) records.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::fs;
use tracing::warn;

use crate::types::{Fragment, RetrievalError};

/// Fragments plus inline vectors for one source.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceIndexArtifact {
    pub fragments: Vec<Fragment>,
    /// Parallel to `fragments`; an empty vector marks a missing embedding.
    pub vectors: Vec<Vec<f32>>,
    pub indexed_at: DateTime<Utc>,
    pub total_documents: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingsMetadata {
    pub model: String,
    pub dimensions: usize,
    pub generated_at: DateTime<Utc>,
    pub total_fragments: usize,
    pub successful: usize,
}

/// Embeddings-only artifact, keyed by fragment id.
#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingsArtifact {
    pub metadata: EmbeddingsMetadata,
    pub embeddings: HashMap<String, Vec<f32>>,
}

/// Writes a JSON artifact, creating parent directories as needed.
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), RetrievalError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let serialized =
        serde_json::to_string_pretty(value).map_err(|err| RetrievalError::Storage(err.to_string()))?;
    fs::write(path, serialized).await?;
    Ok(())
}

/// Reads a JSON artifact. A missing or malformed file is "no prior state":
/// it logs and returns `None` instead of failing the load.
pub async fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Option<T> {
    if !path.exists() {
        return None;
    }
    let data = match fs::read_to_string(path).await {
        Ok(data) => data,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "unreadable artifact, starting fresh");
            return None;
        }
    };
    match serde_json::from_str(&data) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "corrupt artifact, starting fresh");
            None
        }
    }
}
