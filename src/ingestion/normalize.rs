//! Content normalization: one raw document in, one clean text record out.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A source document reduced to the fields the chunker needs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NormalizedDocument {
    /// Stable identifier from the originating connector.
    pub id: String,
    /// Display name (file name or page title).
    pub name: String,
    /// Cleaned full text.
    pub text: String,
    /// Optional grouping label (parent folder or guide section).
    pub parent: Option<String>,
}

impl NormalizedDocument {
    /// Normalizes a raw document. Pure transformation; fetch retries and
    /// error sentinels are the connector's concern.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        raw_text: &str,
        parent: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            text: normalize_text(raw_text),
            parent,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn stripped_chars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Characters outside this set have broken downstream tokenization
    // before; punctuation needed for sentence splitting is kept.
    RE.get_or_init(|| Regex::new(r"[^\w\s.!?,-]").expect("static regex"))
}

/// Collapses whitespace runs to single spaces and strips characters likely
/// to break downstream tokenization.
pub fn normalize_text(raw: &str) -> String {
    let collapsed = whitespace_re().replace_all(raw, " ");
    let cleaned = stripped_chars_re().replace_all(&collapsed, "");
    cleaned.trim().to_string()
}
