//! Ingestion utilities for turning raw source documents into fragments.
//!
//! * [`normalize`]: cleans a raw document into a normalized text record.
//! * [`chunk`]: splits normalized text into bounded, ordered fragments.

pub mod chunk;
pub mod normalize;

pub use chunk::{SentenceChunker, WindowChunker};
pub use normalize::{NormalizedDocument, normalize_text};
