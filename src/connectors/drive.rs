//! Document-store connector: folder walking and cached content access.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::MAX_FOLDER_DEPTH;
use crate::types::RetrievalError;

/// A document listed by the store, before its content is fetched.
#[derive(Clone, Debug, PartialEq)]
pub struct DriveDocumentMeta {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    /// Slash-joined folder path from the corpus root, empty at the root.
    pub parent_path: String,
}

/// One entry of a folder listing.
#[derive(Clone, Debug)]
pub enum FolderEntry {
    Folder { id: String, name: String },
    Document { meta: DriveDocumentMeta },
}

/// Minimal surface the remote document API must provide: list one folder,
/// fetch one document's text. The recursive walk and caching live here in
/// the crate so they stay testable without the remote service.
#[async_trait]
pub trait FolderSource: Send + Sync {
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<FolderEntry>, RetrievalError>;

    async fn fetch_content(&self, id: &str, mime_type: &str) -> Result<String, RetrievalError>;
}

/// The connector interface the indexing pipeline consumes.
#[async_trait]
pub trait DocumentConnector: Send + Sync {
    /// Lists every document under the corpus root, recursively.
    async fn list_documents(&self) -> Result<Vec<DriveDocumentMeta>, RetrievalError>;

    /// Returns a document's text. Per-document failures become a sentinel
    /// string rather than an error so one broken file cannot abort a
    /// whole-corpus pass.
    async fn get_content(&self, id: &str, mime_type: &str) -> String;
}

/// Depth-capped recursive walk over a [`FolderSource`].
///
/// The cap guards against cycles from misconfigured shared folders; a
/// folder at the cap is logged and skipped, never an error.
pub async fn walk_documents<S: FolderSource>(
    source: &S,
    root_folder_id: &str,
) -> Result<Vec<DriveDocumentMeta>, RetrievalError> {
    let mut documents = Vec::new();
    // (folder id, parent path, depth), iterative to keep the future Send.
    let mut pending = vec![(root_folder_id.to_string(), String::new(), 0usize)];

    while let Some((folder_id, parent_path, depth)) = pending.pop() {
        if depth >= MAX_FOLDER_DEPTH {
            warn!(folder_id, depth, "folder depth cap reached, skipping subtree");
            continue;
        }
        let entries = match source.list_folder(&folder_id).await {
            Ok(entries) => entries,
            Err(err) => {
                // One unreadable folder should not sink the walk.
                warn!(folder_id, error = %err, "failed to list folder, skipping");
                continue;
            }
        };
        for entry in entries {
            match entry {
                FolderEntry::Folder { id, name } => {
                    let path = if parent_path.is_empty() {
                        name
                    } else {
                        format!("{parent_path}/{name}")
                    };
                    pending.push((id, path, depth + 1));
                }
                FolderEntry::Document { mut meta } => {
                    meta.parent_path = parent_path.clone();
                    documents.push(meta);
                }
            }
        }
    }

    debug!(count = documents.len(), "folder walk complete");
    Ok(documents)
}

/// Caching [`DocumentConnector`] over a [`FolderSource`].
///
/// Content is memoized by document id for the life of the connector, and
/// fetch errors are cached as the sentinel so they are not retried on
/// every pass.
pub struct CachedConnector<S> {
    source: S,
    root_folder_id: String,
    content_cache: Arc<Mutex<HashMap<String, String>>>,
}

impl<S: FolderSource> CachedConnector<S> {
    pub fn new(source: S, root_folder_id: impl Into<String>) -> Self {
        Self {
            source,
            root_folder_id: root_folder_id.into(),
            content_cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Drops all memoized content.
    pub async fn clear_cache(&self) {
        self.content_cache.lock().await.clear();
    }
}

/// Sentinel returned when a document's content cannot be fetched.
pub fn inaccessible_sentinel(reason: &str) -> String {
    format!("[Document content not accessible: {reason}]")
}

/// Returns `true` for content produced by [`inaccessible_sentinel`].
pub fn is_inaccessible(content: &str) -> bool {
    content.starts_with("[Document content not accessible:")
}

#[async_trait]
impl<S: FolderSource> DocumentConnector for CachedConnector<S> {
    async fn list_documents(&self) -> Result<Vec<DriveDocumentMeta>, RetrievalError> {
        walk_documents(&self.source, &self.root_folder_id).await
    }

    async fn get_content(&self, id: &str, mime_type: &str) -> String {
        if let Some(cached) = self.content_cache.lock().await.get(id) {
            return cached.clone();
        }
        let content = match self.source.fetch_content(id, mime_type).await {
            Ok(content) => content,
            Err(err) => {
                warn!(document_id = id, error = %err, "content fetch failed");
                inaccessible_sentinel(&err.to_string())
            }
        };
        self.content_cache
            .lock()
            .await
            .insert(id.to_string(), content.clone());
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory folder tree for exercising the walk.
    struct FakeDrive {
        folders: HashMap<String, Vec<FolderEntry>>,
        fetches: Arc<Mutex<usize>>,
    }

    impl FakeDrive {
        fn doc(id: &str, name: &str) -> FolderEntry {
            FolderEntry::Document {
                meta: DriveDocumentMeta {
                    id: id.into(),
                    name: name.into(),
                    mime_type: "text/plain".into(),
                    parent_path: String::new(),
                },
            }
        }
    }

    #[async_trait]
    impl FolderSource for FakeDrive {
        async fn list_folder(&self, folder_id: &str) -> Result<Vec<FolderEntry>, RetrievalError> {
            self.folders
                .get(folder_id)
                .cloned()
                .ok_or_else(|| RetrievalError::Connector(format!("no folder {folder_id}")))
        }

        async fn fetch_content(&self, id: &str, _mime: &str) -> Result<String, RetrievalError> {
            *self.fetches.lock().await += 1;
            if id == "broken" {
                return Err(RetrievalError::Connector("permission denied".into()));
            }
            Ok(format!("content of {id}"))
        }
    }

    fn nested_drive() -> FakeDrive {
        let mut folders = HashMap::new();
        folders.insert(
            "root".to_string(),
            vec![
                FakeDrive::doc("a", "Alpha"),
                FolderEntry::Folder {
                    id: "sub".into(),
                    name: "Guides".into(),
                },
            ],
        );
        folders.insert("sub".to_string(), vec![FakeDrive::doc("b", "Beta")]);
        FakeDrive {
            folders,
            fetches: Arc::new(Mutex::new(0)),
        }
    }

    #[tokio::test]
    async fn walk_records_parent_paths() {
        let docs = walk_documents(&nested_drive(), "root").await.unwrap();
        assert_eq!(docs.len(), 2);
        let beta = docs.iter().find(|d| d.id == "b").unwrap();
        assert_eq!(beta.parent_path, "Guides");
        let alpha = docs.iter().find(|d| d.id == "a").unwrap();
        assert_eq!(alpha.parent_path, "");
    }

    #[tokio::test]
    async fn walk_stops_at_depth_cap() {
        // A folder that lists itself would loop forever without the cap.
        let mut folders = HashMap::new();
        folders.insert(
            "loop".to_string(),
            vec![
                FakeDrive::doc("d", "Doc"),
                FolderEntry::Folder {
                    id: "loop".into(),
                    name: "Loop".into(),
                },
            ],
        );
        let drive = FakeDrive {
            folders,
            fetches: Arc::new(Mutex::new(0)),
        };
        let docs = walk_documents(&drive, "loop").await.unwrap();
        assert_eq!(docs.len(), MAX_FOLDER_DEPTH);
    }

    #[tokio::test]
    async fn content_is_cached_and_errors_become_sentinel() {
        let drive = nested_drive();
        let fetches = drive.fetches.clone();
        let connector = CachedConnector::new(drive, "root");

        let first = connector.get_content("a", "text/plain").await;
        let second = connector.get_content("a", "text/plain").await;
        assert_eq!(first, "content of a");
        assert_eq!(first, second);
        assert_eq!(*fetches.lock().await, 1);

        let broken = connector.get_content("broken", "text/plain").await;
        assert!(is_inaccessible(&broken));
        assert!(broken.contains("permission denied"));
    }
}
