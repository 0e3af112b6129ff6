//! End-to-end exercises of the indexing pipeline and hybrid search using
//! in-memory source fixtures and the deterministic mock embedder.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::FmtSubscriber;
use url::Url;

use docsift::config::{ArtifactPaths, EmbeddingConfig};
use docsift::connectors::drive::{
    CachedConnector, DriveDocumentMeta, FolderEntry, FolderSource,
};
use docsift::connectors::guide::{GuideSource, ScrapedPage};
use docsift::embeddings::MockEmbeddingProvider;
use docsift::{HybridSearch, IndexPipeline, IndexStore, RetrievalError, SourceKind};

struct FixtureDrive;

#[async_trait]
impl FolderSource for FixtureDrive {
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<FolderEntry>, RetrievalError> {
        match folder_id {
            "root" => Ok(vec![
                doc("sync-plan", "Content sync plan"),
                doc("device-notes", "Device provisioning notes"),
                FolderEntry::Folder {
                    id: "archive".into(),
                    name: "Archive".into(),
                },
            ]),
            "archive" => Ok(vec![doc("old-runbook", "Old runbook")]),
            other => Err(RetrievalError::Connector(format!("no folder {other}"))),
        }
    }

    async fn fetch_content(&self, id: &str, _mime: &str) -> Result<String, RetrievalError> {
        let body = match id {
            "sync-plan" => {
                "Syncing content channels requires a stable connection to the studio. \
                 Import each channel once and export it to every facility device. \
                 Schedule the sync overnight so classrooms are not disrupted."
            }
            "device-notes" => {
                "Provisioning a new device starts with the setup wizard. \
                 Create the facility, name the device, and join the local network. \
                 Provisioned devices appear in the device management table."
            }
            "old-runbook" => {
                "The old runbook describes manual steps that are now automated. \
                 It is kept only so historical incidents can be cross referenced."
            }
            other => return Err(RetrievalError::Connector(format!("no document {other}"))),
        };
        Ok(body.to_string())
    }
}

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

struct FixtureGuide;

#[async_trait]
impl GuideSource for FixtureGuide {
    async fn discover_pages(&self) -> Result<Vec<Url>, RetrievalError> {
        Ok(vec![
            Url::parse("https://docs.example.com/en/latest/install.html").unwrap(),
            Url::parse("https://docs.example.com/en/latest/manage.html").unwrap(),
        ])
    }

    async fn scrape_page(&self, url: &Url) -> Result<Option<ScrapedPage>, RetrievalError> {
        let (title, content, sections) = if url.path().ends_with("install.html") {
            (
                "Installing on Windows",
                "Download the Windows installer from the releases page and run it. \
                 Installation needs administrator permissions and a few minutes. \
                 After installation the server starts automatically.",
                vec!["Installation".to_string(), "Windows".to_string()],
            )
        } else {
            (
                "Managing users",
                "Administrators create user accounts from the facility dashboard. \
                 Coaches and learners receive different permission levels. \
                 User management also covers resetting passwords.",
                vec!["Users".to_string(), "Permissions".to_string()],
            )
        };
        Ok(Some(ScrapedPage {
            url: url.clone(),
            title: title.into(),
            content: content.into(),
            sections,
        }))
    }
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

fn fast_config() -> EmbeddingConfig {
    EmbeddingConfig {
        batch_size: 10,
        max_concurrent_batches: 3,
        wave_delay: Duration::from_millis(0),
        model: "mock-embedding".into(),
    }
}

async fn indexed_workspace(dir: &tempfile::TempDir) -> (Arc<IndexStore>, HybridSearch) {
    init_tracing();
    let store = Arc::new(IndexStore::new(ArtifactPaths::under(dir.path())));
    let provider = Arc::new(MockEmbeddingProvider::new());
    let pipeline = IndexPipeline::new(store.clone(), provider.clone(), fast_config());

    let connector = CachedConnector::new(FixtureDrive, "root");
    pipeline.index_drive_documents(&connector).await.unwrap();
    pipeline.refresh_guide(&FixtureGuide).await.unwrap();
    pipeline.embed_guide_fragments().await.unwrap();

    let search = HybridSearch::new(store.clone(), provider);
    (store, search)
}

#[tokio::test]
async fn full_pipeline_indexes_both_sources() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _search) = indexed_workspace(&dir).await;

    assert!(store.len() >= 5);
    assert_eq!(store.embedded_count(), store.len());

    let snapshot = store.snapshot();
    assert!(
        snapshot
            .iter()
            .any(|e| e.fragment.source_kind() == SourceKind::DriveDocument)
    );
    assert!(
        snapshot
            .iter()
            .any(|e| e.fragment.source_kind() == SourceKind::ScrapedPage)
    );
}

#[tokio::test]
async fn search_returns_ranked_document_level_results() {
    let dir = tempfile::tempdir().unwrap();
    let (_store, search) = indexed_workspace(&dir).await;

    let results = search.search("sync content channels", 5).await.unwrap();
    assert!(!results.is_empty());
    assert!(results.len() <= 5);
    for pair in results.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }

    // One entry per document, never per fragment.
    let mut ids: Vec<&str> = results.iter().map(|r| r.document_id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), results.len());
}

#[tokio::test]
async fn top_k_truncates_the_merged_list() {
    let dir = tempfile::tempdir().unwrap();
    let (_store, search) = indexed_workspace(&dir).await;

    // Five qualifying documents are indexed across both sources, so the
    // merged list is truncated to exactly top_k.
    let results = search.search("device facility management", 2).await.unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn keyword_phase_carries_unembedded_fragments() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(IndexStore::new(ArtifactPaths::under(dir.path())));
    let provider = Arc::new(MockEmbeddingProvider::new());
    let pipeline = IndexPipeline::new(store.clone(), provider.clone(), fast_config());

    // Refresh the guide but skip the embedding pass: fragments exist with
    // no vectors, so only keyword scoring can reach them.
    pipeline.refresh_guide(&FixtureGuide).await.unwrap();
    assert_eq!(store.embedded_count(), 0);

    let search = HybridSearch::new(store, provider);
    let results = search.search("install windows", 5).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document_name, "Installing on Windows");
    assert_eq!(results[0].source_kind, SourceKind::ScrapedPage);
    assert!(results[0].url.is_some());

    let miss = search.search("completely unrelated kubernetes", 5).await.unwrap();
    assert!(miss.is_empty());
}

#[tokio::test]
async fn empty_index_search_is_an_error() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(IndexStore::new(ArtifactPaths::under(dir.path())));
    let search = HybridSearch::new(store, Arc::new(MockEmbeddingProvider::new()));

    assert!(matches!(
        search.search("anything", 5).await,
        Err(RetrievalError::EmptyIndex)
    ));
}

#[tokio::test]
async fn index_survives_a_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _search) = indexed_workspace(&dir).await;
    let before = store.len();
    let embedded_before = store.embedded_count();
    drop(store);

    // A fresh store sees only the persisted artifacts.
    let reloaded = Arc::new(IndexStore::new(ArtifactPaths::under(dir.path())));
    reloaded.load().await.unwrap();
    assert_eq!(reloaded.len(), before);
    assert_eq!(reloaded.embedded_count(), embedded_before);

    let search = HybridSearch::new(reloaded, Arc::new(MockEmbeddingProvider::new()));
    let results = search.search("provisioning a new device", 3).await.unwrap();
    assert!(!results.is_empty());
    assert!(results.len() <= 3);
}
