//! Hybrid query path: vector similarity plus keyword fallback.
//!
//! * [`hybrid`]: the two-phase engine and cosine scoring.
//! * [`keyword`]: raw keyword tallies and normalization.
//! * [`aggregate`]: fragment hits regrouped into document results.

pub mod aggregate;
pub mod hybrid;
pub mod keyword;

pub use aggregate::{DocumentHit, ScoredFragment};
pub use hybrid::{HybridSearch, cosine_similarity};
