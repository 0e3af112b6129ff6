//! Keyword fallback scoring for fragments without embeddings.

use crate::config::{KeywordWeights, MIN_QUERY_WORD_LEN};
use crate::types::Fragment;

/// Lowercased query words eligible for scoring; short words carry no
/// signal and are dropped.
pub fn query_words(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.len() > MIN_QUERY_WORD_LEN)
        .map(str::to_string)
        .collect()
}

/// Raw integer relevance tally for one fragment.
pub fn score_fragment(words: &[String], fragment: &Fragment, weights: &KeywordWeights) -> u32 {
    let content = fragment.content.to_lowercase();
    let title = fragment.document_name.to_lowercase();
    let topics = fragment.source.topics();

    let mut score = 0u32;
    for word in words {
        if content.contains(word.as_str()) {
            score += weights.content_hit;
        }
        if title.contains(word.as_str()) {
            score += weights.title_hit;
        }
        if topics.iter().any(|topic| topic.contains(word.as_str())) {
            score += weights.topic_hit;
        }
    }
    score
}

/// Maps a raw tally onto the 0..1 range cosine scores live in, purely for
/// merge comparability. Not a probability.
pub fn normalize_score(raw: u32, weights: &KeywordWeights) -> f32 {
    (raw as f32 / weights.normalizer).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FragmentSource;

    fn fragment(content: &str, name: &str, topics: Vec<&str>) -> Fragment {
        Fragment {
            id: "doc-fragment-0".into(),
            content: content.into(),
            document_id: "doc".into(),
            document_name: name.into(),
            position: 0,
            total_in_document: 1,
            source: FragmentSource::Guide {
                url: "https://docs.example.com/page".into(),
                section: None,
                topics: topics.into_iter().map(String::from).collect(),
            },
        }
    }

    #[test]
    fn short_query_words_are_ignored() {
        assert_eq!(query_words("to do an install"), vec!["install"]);
        assert!(query_words("a to of").is_empty());
    }

    #[test]
    fn weights_apply_per_word_and_field() {
        let weights = KeywordWeights::default();
        let words = query_words("install windows");
        let fragment = fragment(
            "How to install the platform on Windows machines.",
            "Windows installation guide",
            vec!["installation", "windows"],
        );

        // "install": content +2, title (installation) +3, topic +2 = 7
        // "windows": content +2, title +3, topic +2 = 7
        assert_eq!(score_fragment(&words, &fragment, &weights), 14);
    }

    #[test]
    fn zero_score_for_unrelated_fragment() {
        let weights = KeywordWeights::default();
        let words = query_words("install windows");
        let fragment = fragment(
            "Troubleshooting network issues on the device.",
            "Network guide",
            vec!["network"],
        );
        assert_eq!(score_fragment(&words, &fragment, &weights), 0);
    }

    #[test]
    fn normalization_is_clamped_to_one() {
        let weights = KeywordWeights::default();
        assert_eq!(normalize_score(5, &weights), 0.5);
        assert_eq!(normalize_score(10, &weights), 1.0);
        assert_eq!(normalize_score(25, &weights), 1.0);
    }
}
