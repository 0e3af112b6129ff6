//! Source connectors: the two collaborators the corpus is assembled from.
//!
//! * [`drive`]: cloud document repository (nested folders, office-style
//!   files). The remote API lives behind a trait; this module owns the
//!   recursive walk, depth cap, and content caching.
//! * [`guide`]: scraped documentation site: page discovery from the
//!   navigation tree, rate-limited page scraping, topic extraction.

pub mod drive;
pub mod guide;

pub use drive::{CachedConnector, DocumentConnector, DriveDocumentMeta, FolderEntry, FolderSource};
pub use guide::{GuideScraper, GuideSource, ScrapedPage};
