// src/feed/mod.rs
pub mod rss;

use async_trait::async_trait;

/// One item from the polled feed. The upstream feed delivers entries
/// newest-first; that ordering is trusted as-is and never re-derived from
/// `published_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// Stable link URL, the de-facto primary key. Absent on malformed items.
    pub link: Option<String>,
    pub title: String,
    pub summary: String,
    /// Unix seconds; 0 when the item carries no parseable pubDate.
    pub published_at: u64,
}

/// Typed fetch failures. All variants are recoverable: they increment the
/// failure counter and trigger backoff, never a crash.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("feed XML did not parse: {0}")]
    Parse(#[from] quick_xml::DeError),
}

/// Source of feed entries. The watcher only depends on this trait, so tests
/// substitute scripted sources for the HTTP one.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the current feed, newest entry first.
    async fn fetch(&self) -> Result<Vec<FeedEntry>, FetchError>;
}

/// Normalize entry text for display and notification delivery: decode HTML
/// entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}
