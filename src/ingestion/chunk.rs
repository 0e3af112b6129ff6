//! Fragment production: sentence-respecting splitting with bounded sizes.
//!
//! Two strategies cover the two source shapes:
//!
//! * [`SentenceChunker`]: accumulates sentences up to a small budget;
//!   used for document-store files whose fragments must stay well under
//!   the embedding service's per-input limit.
//! * [`WindowChunker`]: fixed character windows with overlap, extended to
//!   the next sentence boundary; used for scraped pages, which are long
//!   and often lack clean sentence structure.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::{ChunkConfig, MIN_SENTENCE_LEN};
use crate::ingestion::normalize::NormalizedDocument;
use crate::types::{Fragment, FragmentSource};

fn sentence_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+").expect("static regex"))
}

/// Sentence-accumulating chunker for the document-store path.
#[derive(Clone, Debug)]
pub struct SentenceChunker {
    config: ChunkConfig,
}

impl SentenceChunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Splits a normalized document into ordered fragments, each tagged
    /// with the provided source metadata.
    pub fn chunk(&self, doc: &NormalizedDocument, source: &FragmentSource) -> Vec<Fragment> {
        let sentences: Vec<&str> = sentence_split_re()
            .split(&doc.text)
            .map(str::trim)
            .filter(|s| s.len() > MIN_SENTENCE_LEN)
            .collect();

        let mut contents: Vec<String> = Vec::new();
        let mut current = String::new();

        for sentence in sentences {
            let would_be = current.len() + 1 + sentence.len();
            if would_be > self.config.max_fragment_len && !current.is_empty() {
                contents.push(std::mem::take(&mut current));
                current.push_str(sentence);
            } else {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(sentence);
            }
        }
        if !current.trim().is_empty() {
            contents.push(current);
        }

        assemble(doc, source, contents, self.config.min_fragment_len)
    }
}

/// Overlapping character-window chunker for the scraped-page path.
#[derive(Clone, Debug)]
pub struct WindowChunker {
    config: ChunkConfig,
}

impl WindowChunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn chunk(&self, doc: &NormalizedDocument, source: &FragmentSource) -> Vec<Fragment> {
        let chars: Vec<char> = doc.text.chars().collect();
        let len = chars.len();
        let size = self.config.max_fragment_len;
        let overlap = self.config.window_overlap.min(size.saturating_sub(1));

        if len <= size {
            return assemble(
                doc,
                source,
                vec![doc.text.clone()],
                self.config.min_fragment_len,
            );
        }

        // Hard stop bounds pathological inputs where overlap arithmetic
        // would otherwise stall the cursor.
        let stride = size - overlap;
        let max_windows = len.div_ceil(stride) + 10;

        let mut contents = Vec::new();
        let mut start = 0usize;
        let mut emitted = 0usize;

        while start < len && emitted < max_windows {
            let end = (start + size).min(len);
            let cut = self.boundary_extended_end(&chars, end);
            let window: String = chars[start..cut].iter().collect();
            // Undersized windows are dropped by `assemble`, nowhere else.
            contents.push(window);
            emitted += 1;

            start = end.saturating_sub(overlap);
            // Trailing sliver already covered by the previous window.
            if start + self.config.boundary_lookahead >= len {
                break;
            }
        }

        assemble(doc, source, contents, self.config.min_fragment_len)
    }

    /// Extends a window end to the next `". "` boundary within the
    /// lookahead so windows do not cut mid-sentence.
    fn boundary_extended_end(&self, chars: &[char], end: usize) -> usize {
        if end >= chars.len() {
            return chars.len();
        }
        let horizon = (end + self.config.boundary_lookahead).min(chars.len() - 1);
        for i in end..horizon {
            if chars[i] == '.' && chars[i + 1] == ' ' {
                return i + 1;
            }
        }
        end
    }
}

/// Drops undersized fragments, then assigns dense positions and ids.
fn assemble(
    doc: &NormalizedDocument,
    source: &FragmentSource,
    contents: Vec<String>,
    min_len: usize,
) -> Vec<Fragment> {
    let kept: Vec<String> = contents
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| c.chars().count() >= min_len)
        .collect();

    let total = kept.len();
    kept.into_iter()
        .enumerate()
        .map(|(position, content)| Fragment {
            id: Fragment::fragment_id(&doc.id, position),
            content,
            document_id: doc.id.clone(),
            document_name: doc.name.clone(),
            position,
            total_in_document: total,
            source: source.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkConfig;

    fn drive_source() -> FragmentSource {
        FragmentSource::Drive {
            parent_folder: None,
        }
    }

    fn guide_source() -> FragmentSource {
        FragmentSource::Guide {
            url: "https://docs.example.com/page".into(),
            section: None,
            topics: vec![],
        }
    }

    fn doc(text: &str) -> NormalizedDocument {
        NormalizedDocument::new("doc-1", "Test Document", text, None)
    }

    fn long_text(sentences: usize) -> String {
        (0..sentences)
            .map(|i| format!("Sentence number {i} talks about installing the platform correctly."))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn fragments_respect_size_bounds() {
        let chunker = SentenceChunker::new(ChunkConfig::drive());
        let fragments = chunker.chunk(&doc(&long_text(30)), &drive_source());
        assert!(fragments.len() > 1);
        for fragment in &fragments {
            assert!(fragment.content.len() >= 50, "too short: {}", fragment.content);
            // One sentence of slack: the overflowing sentence starts the
            // next buffer, so no emitted fragment exceeds max + sentence.
            assert!(fragment.content.len() <= 300 + 80);
        }
    }

    #[test]
    fn positions_are_dense_and_increasing() {
        let chunker = SentenceChunker::new(ChunkConfig::drive());
        let fragments = chunker.chunk(&doc(&long_text(25)), &drive_source());
        for (i, fragment) in fragments.iter().enumerate() {
            assert_eq!(fragment.position, i);
            assert_eq!(fragment.total_in_document, fragments.len());
            assert_eq!(fragment.id, format!("doc-1-fragment-{i}"));
        }
    }

    #[test]
    fn rechunking_a_short_fragment_is_identity() {
        let chunker = SentenceChunker::new(ChunkConfig::drive());
        let first = chunker.chunk(
            &doc("This single sentence easily fits inside one fragment boundary."),
            &drive_source(),
        );
        assert_eq!(first.len(), 1);

        let again = chunker.chunk(&doc(&first[0].content), &drive_source());
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].content, first[0].content);
    }

    #[test]
    fn short_fragments_are_dropped() {
        let chunker = SentenceChunker::new(ChunkConfig::drive());
        let fragments = chunker.chunk(&doc("Too short to keep."), &drive_source());
        assert!(fragments.is_empty());
    }

    #[test]
    fn window_chunker_keeps_small_page_whole() {
        let chunker = WindowChunker::new(ChunkConfig::guide());
        let text = long_text(5);
        let fragments = chunker.chunk(&doc(&text), &guide_source());
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].content, text);
    }

    #[test]
    fn window_chunker_overlaps_long_pages() {
        let chunker = WindowChunker::new(ChunkConfig::guide());
        let text = long_text(80); // well over one 1500-char window
        let fragments = chunker.chunk(&doc(&text), &guide_source());
        assert!(fragments.len() > 1);
        for fragment in &fragments {
            assert!(fragment.content.len() >= 50);
            // Window plus boundary lookahead is the hard ceiling.
            assert!(fragment.content.len() <= 1500 + 100);
        }
        // Overlap means consecutive fragments share text.
        let first_tail: String = fragments[0]
            .content
            .chars()
            .rev()
            .take(50)
            .collect::<String>()
            .chars()
            .rev()
            .collect();
        assert!(fragments[1].content.contains(first_tail.trim()));
    }

    #[test]
    fn window_chunker_bounds_pathological_input() {
        // Overlap nearly equal to the window size would stall a naive
        // cursor; the iteration cap must still terminate the loop.
        let config = ChunkConfig {
            max_fragment_len: 100,
            min_fragment_len: 10,
            window_overlap: 99,
            boundary_lookahead: 10,
        };
        let chunker = WindowChunker::new(config);
        let text: String = "word ".repeat(200);
        let fragments = chunker.chunk(&doc(text.trim()), &guide_source());
        assert!(!fragments.is_empty());
        assert!(fragments.len() <= 1000 / 1 + 10 + 1);
    }

    #[test]
    fn exact_minimum_length_window_is_kept() {
        let config = ChunkConfig {
            max_fragment_len: 20,
            min_fragment_len: 10,
            window_overlap: 0,
            boundary_lookahead: 0,
        };
        let chunker = WindowChunker::new(config);
        // 50 chars without whitespace: windows of 20, 20, and exactly the
        // minimum length of 10.
        let text = "abcdefghij".repeat(5);
        let fragments = chunker.chunk(&doc(&text), &guide_source());
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[2].content.chars().count(), 10);
    }
}
