//! Configuration defaults and environment overrides.
//!
//! Every empirically tuned constant lives here under a name rather than as
//! a literal in the code that applies it. Values can be overridden through
//! environment variables (loaded via `dotenvy`), which is how deployments
//! adjust chunk sizes or scoring weights without a rebuild.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Minimum fragment length after trimming; shorter fragments carry too
/// little signal and are dropped before indexing.
pub const MIN_FRAGMENT_LEN: usize = 50;

/// Maximum fragment size for the document-store path, sized for the
/// embedding service's per-input token budget.
pub const DRIVE_MAX_FRAGMENT_LEN: usize = 300;

/// Maximum fragment size for the scraped-page path, which tolerates a
/// larger token budget downstream.
pub const GUIDE_MAX_FRAGMENT_LEN: usize = 1500;

/// Character overlap between adjacent windowed fragments.
pub const GUIDE_WINDOW_OVERLAP: usize = 200;

/// How far past a window end we look for a sentence boundary before
/// cutting mid-sentence.
pub const GUIDE_BOUNDARY_LOOKAHEAD: usize = 100;

/// Sentence splitter drops sentences at or below this trimmed length.
pub const MIN_SENTENCE_LEN: usize = 5;

/// Query words at or below this length are ignored by keyword scoring.
pub const MIN_QUERY_WORD_LEN: usize = 2;

/// Chunking parameters for one source path.
#[derive(Clone, Debug)]
pub struct ChunkConfig {
    pub max_fragment_len: usize,
    pub min_fragment_len: usize,
    pub window_overlap: usize,
    pub boundary_lookahead: usize,
}

impl ChunkConfig {
    /// Defaults for the document-store path (sentence accumulation).
    pub fn drive() -> Self {
        Self {
            max_fragment_len: env_usize("DOCSIFT_DRIVE_MAX_FRAGMENT", DRIVE_MAX_FRAGMENT_LEN),
            min_fragment_len: env_usize("DOCSIFT_MIN_FRAGMENT", MIN_FRAGMENT_LEN),
            window_overlap: GUIDE_WINDOW_OVERLAP,
            boundary_lookahead: GUIDE_BOUNDARY_LOOKAHEAD,
        }
    }

    /// Defaults for the scraped-page path (character windows).
    pub fn guide() -> Self {
        Self {
            max_fragment_len: env_usize("DOCSIFT_GUIDE_MAX_FRAGMENT", GUIDE_MAX_FRAGMENT_LEN),
            min_fragment_len: env_usize("DOCSIFT_MIN_FRAGMENT", MIN_FRAGMENT_LEN),
            window_overlap: env_usize("DOCSIFT_GUIDE_OVERLAP", GUIDE_WINDOW_OVERLAP),
            boundary_lookahead: GUIDE_BOUNDARY_LOOKAHEAD,
        }
    }
}

/// Batch shaping and pacing for the embedding generator.
#[derive(Clone, Debug)]
pub struct EmbeddingConfig {
    /// Fragments per service request.
    pub batch_size: usize,
    /// Batches in flight per wave.
    pub max_concurrent_batches: usize,
    /// Pause between waves, respecting service rate limits.
    pub wave_delay: Duration,
    /// Model identifier sent to the embedding service.
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            max_concurrent_batches: 3,
            wave_delay: Duration::from_millis(1000),
            model: "text-embedding-3-small".to_string(),
        }
    }
}

impl EmbeddingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            batch_size: env_usize("DOCSIFT_EMBED_BATCH", defaults.batch_size),
            max_concurrent_batches: env_usize(
                "DOCSIFT_EMBED_CONCURRENCY",
                defaults.max_concurrent_batches,
            ),
            wave_delay: Duration::from_millis(env_u64(
                "DOCSIFT_EMBED_WAVE_DELAY_MS",
                defaults.wave_delay.as_millis() as u64,
            )),
            model: env::var("DOCSIFT_EMBED_MODEL").unwrap_or(defaults.model),
        }
    }
}

/// Keyword relevance weights.
///
/// These are empirical tuning values carried over from production use, not
/// derived from a principled model; `normalizer` maps the raw integer tally
/// onto the same 0..1 scale as cosine similarity for merging.
#[derive(Clone, Debug)]
pub struct KeywordWeights {
    /// Points per query word found in fragment content.
    pub content_hit: u32,
    /// Points per query word found in the document name.
    pub title_hit: u32,
    /// Points per query word matching a declared topic tag.
    pub topic_hit: u32,
    /// Divisor converting the raw tally to a 0..1 similarity.
    pub normalizer: f32,
}

impl Default for KeywordWeights {
    fn default() -> Self {
        Self {
            content_hit: 2,
            title_hit: 3,
            topic_hit: 2,
            normalizer: 10.0,
        }
    }
}

/// Paging and pacing for the documentation-site scraper.
#[derive(Clone, Debug)]
pub struct ScrapeConfig {
    /// Upper bound on discovered pages per run.
    pub max_pages: usize,
    /// Pause between page requests.
    pub request_delay: Duration,
    /// Pages with less extracted text than this are skipped.
    pub min_page_content_len: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            request_delay: Duration::from_millis(1000),
            min_page_content_len: 100,
        }
    }
}

/// Folder recursion cap for the document-store walk, guarding against
/// cycles introduced by misconfigured shared folders.
pub const MAX_FOLDER_DEPTH: usize = 10;

/// Locations of the persisted index artifacts.
#[derive(Clone, Debug)]
pub struct ArtifactPaths {
    /// Drive-source fragments with inline vectors.
    pub drive_index: PathBuf,
    /// Guide-source fragments, vectors persisted separately.
    pub guide_fragments: PathBuf,
    /// Guide-source embeddings keyed by fragment id.
    pub guide_embeddings: PathBuf,
}

impl ArtifactPaths {
    /// Standard layout under a data directory.
    pub fn under(data_dir: impl Into<PathBuf>) -> Self {
        let dir = data_dir.into();
        Self {
            drive_index: dir.join("vector-index.json"),
            guide_fragments: dir.join("guide-fragments.json"),
            guide_embeddings: dir.join("guide-embeddings.json"),
        }
    }

    pub fn from_env() -> Self {
        let dir = env::var("DOCSIFT_DATA_DIR").unwrap_or_else(|_| "data".to_string());
        Self::under(dir)
    }
}

/// Loads `.env` once at startup so `from_env` constructors see overrides.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tuned_values() {
        let weights = KeywordWeights::default();
        assert_eq!(weights.content_hit, 2);
        assert_eq!(weights.title_hit, 3);
        assert_eq!(weights.topic_hit, 2);
        assert_eq!(weights.normalizer, 10.0);

        let embed = EmbeddingConfig::default();
        assert_eq!(embed.batch_size, 20);
        assert_eq!(embed.max_concurrent_batches, 3);
        assert_eq!(embed.wave_delay, Duration::from_millis(1000));
    }

    #[test]
    fn artifact_paths_share_data_dir() {
        let paths = ArtifactPaths::under("data");
        assert!(paths.drive_index.ends_with("vector-index.json"));
        assert!(paths.guide_fragments.ends_with("guide-fragments.json"));
        assert!(paths.guide_embeddings.ends_with("guide-embeddings.json"));
    }

    #[test]
    fn chunk_configs_differ_per_source() {
        let drive = ChunkConfig::drive();
        let guide = ChunkConfig::guide();
        assert!(drive.max_fragment_len < guide.max_fragment_len);
        assert_eq!(drive.min_fragment_len, guide.min_fragment_len);
    }
}
