//! ```text
//! connectors::drive ──► ingestion::normalize ──► SentenceChunker ─┐
//! connectors::guide ──► ingestion::normalize ──► WindowChunker ──┤
//!                                                                 │
//! Fragments ──► embeddings::EmbeddingGenerator ──► vectors        │
//!                                    │                            │
//!                                    ▼                            ▼
//!                         index::IndexStore ◄── pipeline::IndexPipeline
//!                                    │
//!                                    ▼
//!                    search::HybridSearch ──► SearchResult
//! ```
//!
pub mod config;
pub mod connectors;
pub mod embeddings;
pub mod index;
pub mod ingestion;
pub mod pipeline;
pub mod search;
pub mod types;

pub use config::{ArtifactPaths, ChunkConfig, EmbeddingConfig, KeywordWeights, ScrapeConfig};
pub use embeddings::{EmbeddingGenerator, EmbeddingProvider, HttpEmbeddingProvider};
pub use index::IndexStore;
pub use pipeline::IndexPipeline;
pub use search::HybridSearch;
pub use types::{Fragment, FragmentSource, IndexedFragment, RetrievalError, SearchResult, SourceKind};
