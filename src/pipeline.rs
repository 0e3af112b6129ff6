//! Indexing passes: source content in, persisted searchable index out.
//!
//! Three entry points, each runnable on its own:
//!
//! * [`IndexPipeline::index_drive_documents`]: full document-store pass:
//!   walk, fetch, chunk, embed, persist.
//! * [`IndexPipeline::refresh_guide`]: scrape the documentation site and
//!   persist its fragments (keyword-searchable immediately).
//! * [`IndexPipeline::embed_guide_fragments`]: separate embedding pass for
//!   the scraped fragments, persisted as its own artifact.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use url::Url;

use crate::config::{ChunkConfig, EmbeddingConfig};
use crate::connectors::drive::{DocumentConnector, is_inaccessible};
use crate::connectors::guide::{GuideSource, extract_topics, infer_parent_section};
use crate::embeddings::{EmbeddingGenerator, EmbeddingProvider, EmbeddingRun};
use crate::index::IndexStore;
use crate::index::artifacts::{SourceIndexArtifact, write_json};
use crate::ingestion::{NormalizedDocument, SentenceChunker, WindowChunker};
use crate::types::{Fragment, FragmentSource, RetrievalError, SourceKind};

/// Outcome of a document-store indexing pass.
#[derive(Debug)]
pub struct DriveIndexReport {
    pub documents: usize,
    pub skipped: usize,
    pub fragments: usize,
    pub embedded: usize,
}

/// Outcome of a documentation-site refresh.
#[derive(Debug)]
pub struct GuideRefreshReport {
    pub pages_discovered: usize,
    pub pages_indexed: usize,
    pub fragments: usize,
}

pub struct IndexPipeline {
    store: Arc<IndexStore>,
    provider: Arc<dyn EmbeddingProvider>,
    embedding_config: EmbeddingConfig,
}

impl IndexPipeline {
    pub fn new(
        store: Arc<IndexStore>,
        provider: Arc<dyn EmbeddingProvider>,
        embedding_config: EmbeddingConfig,
    ) -> Self {
        Self {
            store,
            provider,
            embedding_config,
        }
    }

    /// Re-indexes the document store from scratch: lists every document,
    /// fetches and chunks its content, embeds the fragments, and replaces
    /// the drive portion of the index.
    ///
    /// Inaccessible and empty documents are skipped, never fatal; embedding
    /// failures leave keyword-only fragments behind.
    pub async fn index_drive_documents(
        &self,
        connector: &dyn DocumentConnector,
    ) -> Result<DriveIndexReport, RetrievalError> {
        let documents = connector.list_documents().await?;
        info!(count = documents.len(), "indexing document store");

        let chunker = SentenceChunker::new(ChunkConfig::drive());
        let mut fragments: Vec<Fragment> = Vec::new();
        let mut skipped = 0usize;

        for meta in &documents {
            let content = connector.get_content(&meta.id, &meta.mime_type).await;
            if is_inaccessible(&content) {
                skipped += 1;
                continue;
            }
            let parent = Some(meta.parent_path.clone()).filter(|p| !p.is_empty());
            let doc = NormalizedDocument::new(&meta.id, &meta.name, &content, parent.clone());
            if doc.is_empty() {
                skipped += 1;
                continue;
            }
            let source = FragmentSource::Drive {
                parent_folder: parent,
            };
            fragments.extend(chunker.chunk(&doc, &source));
        }

        let generator = EmbeddingGenerator::new(self.provider.clone(), self.embedding_config.clone());
        let run = generator.run(&fragments).await;

        self.store
            .replace_source(SourceKind::DriveDocument, fragments.clone(), &run.vectors);
        self.store.save().await?;

        info!(
            documents = documents.len(),
            skipped,
            fragments = fragments.len(),
            embedded = run.succeeded,
            "document store pass complete"
        );
        Ok(DriveIndexReport {
            documents: documents.len(),
            skipped,
            fragments: fragments.len(),
            embedded: run.succeeded,
        })
    }

    /// Scrapes the documentation site and replaces the scraped portion of
    /// the index. Fragments are persisted without vectors; run
    /// [`embed_guide_fragments`](Self::embed_guide_fragments) afterwards to
    /// add them.
    pub async fn refresh_guide(
        &self,
        source: &dyn GuideSource,
    ) -> Result<GuideRefreshReport, RetrievalError> {
        let pages = source.discover_pages().await?;
        let chunker = WindowChunker::new(ChunkConfig::guide());
        let mut fragments: Vec<Fragment> = Vec::new();
        let mut indexed = 0usize;

        for url in &pages {
            let page = match source.scrape_page(url).await {
                Ok(Some(page)) => page,
                Ok(None) => continue,
                Err(err) => {
                    // One failed page must not abort the refresh.
                    warn!(%url, error = %err, "page scrape failed, skipping");
                    continue;
                }
            };

            let topics = extract_topics(&page.sections, &page.content);
            let section = infer_parent_section(&page.url, &page.title);
            let doc = NormalizedDocument::new(
                page_document_id(&page.url),
                &page.title,
                &page.content,
                section.clone(),
            );
            let source_tag = FragmentSource::Guide {
                url: page.url.to_string(),
                section,
                topics,
            };
            let produced = chunker.chunk(&doc, &source_tag);
            if !produced.is_empty() {
                indexed += 1;
            }
            fragments.extend(produced);
        }

        let artifact = guide_artifact(&fragments);
        write_json(&self.store.paths().guide_fragments, &artifact).await?;
        self.store
            .replace_source(SourceKind::ScrapedPage, fragments.clone(), &HashMap::new());

        info!(
            discovered = pages.len(),
            indexed,
            fragments = fragments.len(),
            "guide refresh complete"
        );
        Ok(GuideRefreshReport {
            pages_discovered: pages.len(),
            pages_indexed: indexed,
            fragments: fragments.len(),
        })
    }

    /// Embeds every indexed scraped fragment and persists the vectors as
    /// their own artifact, then attaches them to the live index.
    pub async fn embed_guide_fragments(&self) -> Result<EmbeddingRun, RetrievalError> {
        let fragments: Vec<Fragment> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|entry| entry.fragment.source_kind() == SourceKind::ScrapedPage)
            .map(|entry| entry.fragment)
            .collect();

        let generator = EmbeddingGenerator::new(self.provider.clone(), self.embedding_config.clone());
        let run = generator.run(&fragments).await;
        generator
            .persist(&self.store.paths().guide_embeddings, &run)
            .await?;
        self.store
            .attach_embeddings(SourceKind::ScrapedPage, &run.vectors);
        Ok(run)
    }
}

/// Stable document id for a scraped page, derived from its URL path.
fn page_document_id(url: &Url) -> String {
    let path = url.path().trim_matches('/');
    let trimmed = path.trim_end_matches(".html");
    if trimmed.is_empty() {
        "guide-index".to_string()
    } else {
        trimmed.replace('/', "-")
    }
}

fn guide_artifact(fragments: &[Fragment]) -> SourceIndexArtifact {
    let total_documents = fragments
        .iter()
        .map(|f| f.document_id.as_str())
        .collect::<HashSet<_>>()
        .len();
    SourceIndexArtifact {
        fragments: fragments.to_vec(),
        vectors: fragments.iter().map(|_| Vec::new()).collect(),
        indexed_at: Utc::now(),
        total_documents,
    }
}
