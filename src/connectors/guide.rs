//! Documentation-site connector: page discovery and rate-limited scraping.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ScrapeConfig;
use crate::ingestion::normalize::normalize_text;
use crate::types::RetrievalError;

/// One scraped documentation page.
#[derive(Clone, Debug)]
pub struct ScrapedPage {
    pub url: Url,
    pub title: String,
    pub content: String,
    /// `h1`/`h2`/`h3` heading texts, used for topic extraction.
    pub sections: Vec<String>,
}

/// Interface the indexing pipeline consumes; [`GuideScraper`] is the HTTP
/// implementation, tests substitute fixtures.
#[async_trait]
pub trait GuideSource: Send + Sync {
    async fn discover_pages(&self) -> Result<Vec<Url>, RetrievalError>;

    /// Scrapes one page. `None` means the page was already visited this
    /// run or carried too little content to index.
    async fn scrape_page(&self, url: &Url) -> Result<Option<ScrapedPage>, RetrievalError>;
}

/// Scraper for a sphinx-style documentation site with a `toctree` nav.
pub struct GuideScraper {
    client: Client,
    base_url: Url,
    config: ScrapeConfig,
    visited: Arc<Mutex<HashSet<String>>>,
}

impl GuideScraper {
    pub fn new(client: Client, base_url: Url, config: ScrapeConfig) -> Self {
        Self {
            client,
            base_url,
            config,
            visited: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    async fn fetch(&self, url: &Url) -> Result<String, RetrievalError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()
            .map_err(|err| RetrievalError::Connector(err.to_string()))?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl GuideSource for GuideScraper {
    async fn discover_pages(&self) -> Result<Vec<Url>, RetrievalError> {
        let html = self.fetch(&self.base_url).await?;
        let urls = parse_navigation(&html, &self.base_url, self.config.max_pages);
        info!(count = urls.len(), base = %self.base_url, "discovered guide pages");
        Ok(urls)
    }

    async fn scrape_page(&self, url: &Url) -> Result<Option<ScrapedPage>, RetrievalError> {
        {
            let mut visited = self.visited.lock().await;
            if !visited.insert(url.as_str().to_string()) {
                debug!(%url, "already visited this run");
                return Ok(None);
            }
        }

        let html = self.fetch(&self.url_or_err(url)?).await?;
        let page = parse_page(&html, url);

        // Fixed delay between requests keeps the site's rate limits happy.
        sleep(self.config.request_delay).await;

        if page.content.len() < self.config.min_page_content_len {
            debug!(%url, len = page.content.len(), "skipping page with too little content");
            return Ok(None);
        }
        debug!(%url, title = %page.title, chars = page.content.len(), "scraped page");
        Ok(Some(page))
    }
}

impl GuideScraper {
    fn url_or_err(&self, url: &Url) -> Result<Url, RetrievalError> {
        if url.scheme() == "http" || url.scheme() == "https" {
            Ok(url.clone())
        } else {
            Err(RetrievalError::Connector(format!(
                "unsupported scheme in {url}"
            )))
        }
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// Extracts page links from the navigation tree, deduplicated and capped.
///
/// Parsing is synchronous on purpose: `Html` is not `Send`, so it must not
/// live across an await point.
fn parse_navigation(html: &str, base_url: &Url, max_pages: usize) -> Vec<Url> {
    let document = Html::parse_document(html);
    let nav_links = selector(".toctree-l1 a, .toctree-l2 a");

    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for element in document.select(&nav_links) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if href.contains('#') || href.starts_with("javascript:") {
            continue;
        }
        let Ok(resolved) = base_url.join(href) else {
            warn!(href, "unresolvable navigation link");
            continue;
        };
        if seen.insert(resolved.as_str().to_string()) {
            urls.push(resolved);
        }
        if urls.len() >= max_pages {
            break;
        }
    }

    urls
}

/// Extracts title, clean body text, and section headings from page HTML.
fn parse_page(html: &str, url: &Url) -> ScrapedPage {
    let document = Html::parse_document(html);

    let title = document
        .select(&selector("h1"))
        .next()
        .map(|h1| h1.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| {
            document
                .select(&selector("title"))
                .next()
                .map(|t| t.text().collect::<String>().trim().to_string())
        })
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    let main = selector(".document, .content, main, article, .section");

    let content_root = document.select(&main).next();
    let raw_text: String = match content_root {
        Some(root) => prose_text(root),
        None => document
            .select(&selector("body"))
            .next()
            .map(prose_text)
            .unwrap_or_default(),
    };

    let mut sections = Vec::new();
    for heading in document.select(&selector("h1, h2, h3")) {
        let text = heading.text().collect::<String>().trim().to_string();
        if text.len() > 3 {
            sections.push(text);
        }
    }

    ScrapedPage {
        url: url.clone(),
        title,
        content: normalize_text(&raw_text),
        sections,
    }
}

const PROSE_TAGS: &[&str] = &[
    "p",
    "li",
    "h1",
    "h2",
    "h3",
    "h4",
    "pre",
    "td",
    "blockquote",
    "dd",
    "dt",
];

/// Concatenates prose-bearing element text, which sidesteps navigation,
/// sidebar, script, and style chrome without tree surgery. Only top-most
/// prose elements contribute so nested matches are not double-counted.
fn prose_text(root: scraper::ElementRef<'_>) -> String {
    let prose = selector("p, li, h1, h2, h3, h4, pre, td, blockquote, dd, dt");
    let mut out = String::new();
    for element in root.select(&prose) {
        let self_id = element.id();
        let nested_in_prose = element.ancestors().any(|ancestor| {
            ancestor.id() != self_id
                && ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| PROSE_TAGS.contains(&el.name()))
        });
        if nested_in_prose {
            continue;
        }
        for piece in element.text() {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(piece);
        }
    }
    out
}

/// A small fixed vocabulary of platform terms used to tag fragments for
/// keyword fallback scoring.
const TECHNICAL_TERMS: &[&str] = &[
    "installation",
    "setup",
    "configuration",
    "management",
    "users",
    "classes",
    "facilities",
    "channels",
    "resources",
    "permissions",
    "command",
    "performance",
    "troubleshooting",
    "network",
    "windows",
    "linux",
    "macos",
    "android",
    "debian",
    "ubuntu",
];

/// Extracts up to ten topic tags from section headings and content.
pub fn extract_topics(sections: &[String], content: &str) -> Vec<String> {
    let mut topics = Vec::new();
    let mut seen = HashSet::new();
    let lowered = content.to_lowercase();

    for section in sections {
        if section.len() > 3 && section.len() < 100 {
            let tag = section.to_lowercase();
            if seen.insert(tag.clone()) {
                topics.push(tag);
            }
        }
    }
    for term in TECHNICAL_TERMS {
        if lowered.contains(term) && seen.insert((*term).to_string()) {
            topics.push((*term).to_string());
        }
    }

    topics.truncate(10);
    topics
}

/// Infers a parent section label from the page URL path, falling back to
/// title keywords.
pub fn infer_parent_section(url: &Url, title: &str) -> Option<String> {
    // Hosted doc sites prefix paths with locale and version segments.
    let mut segments = url
        .path_segments()?
        .filter(|s| !s.is_empty() && !matches!(*s, "en" | "latest" | "stable"));
    if let Some(first) = segments.next() {
        let trimmed = first.trim_end_matches(".html");
        if !trimmed.is_empty() && trimmed != "index" {
            return Some(titlecase_words(&trimmed.replace('-', " ")));
        }
    }

    let lowered = title.to_lowercase();
    let inferred = if lowered.contains("install") || lowered.contains("setup") {
        "Install"
    } else if lowered.contains("access") || lowered.contains("connect") {
        "Access"
    } else if lowered.contains("manage") || lowered.contains("admin") {
        "Manage"
    } else if lowered.contains("advanced") || lowered.contains("command") {
        "Advanced Management"
    } else if lowered.contains("coach") || lowered.contains("learn") {
        "Coach"
    } else {
        return None;
    };
    Some(inferred.to_string())
}

fn titlecase_words(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
