// src/feed/rss.rs
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::feed::{FeedEntry, FeedSource, FetchError};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> u64 {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
        .unwrap_or(0)
}

/// HTTP feed source for a single RSS 2.0 feed.
///
/// The request carries a bounded timeout so the poll loop is never stuck on a
/// stalled connection longer than the configured wait.
pub struct HttpFeedSource {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
    user_agent: Option<String>,
}

impl HttpFeedSource {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(10),
            user_agent: None,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Identify ourselves to the feed operator, e.g.
    /// `jobwatcher/0.1.0 (you@example.com)`.
    pub fn with_user_agent(mut self, ua: String) -> Self {
        self.user_agent = Some(ua);
        self
    }

    /// Parse raw RSS XML into entries, feed order preserved (newest-first).
    pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, FetchError> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean)?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            out.push(FeedEntry {
                link: it.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
                title: it.title.unwrap_or_default(),
                summary: it.description.unwrap_or_default(),
                published_at: it
                    .pub_date
                    .as_deref()
                    .map(parse_rfc2822_to_unix)
                    .unwrap_or(0),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("feed_parse_ms").record(ms);
        counter!("feed_entries_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self) -> Result<Vec<FeedEntry>, FetchError> {
        let mut req = self.client.get(&self.url).timeout(self.timeout);
        if let Some(ua) = &self.user_agent {
            req = req.header(reqwest::header::USER_AGENT, ua);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let body = resp.text().await?;
        Self::parse_feed(&body)
    }
}

// Feeds embed named HTML entities that are not valid XML; map the common ones
// before handing the document to the XML parser.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
