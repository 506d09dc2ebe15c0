// src/entry_log.rs
//! Append-only audit log of every fetched entry, one JSON object per line.
//! Useful for tuning the reward threshold against what the feed actually
//! carried. I/O problems here are logged and otherwise ignored.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::feed::FeedEntry;
use crate::reward;

#[derive(Debug, Serialize)]
struct EntryRecord<'a> {
    ts: DateTime<Utc>,
    title: &'a str,
    reward: f64,
    link: Option<&'a str>,
    summary: &'a str,
}

#[derive(Debug)]
pub struct EntryLog {
    path: PathBuf,
}

impl EntryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one record per entry, all stamped with the same fetch time.
    pub fn append(&self, entries: &[FeedEntry]) {
        if entries.is_empty() {
            return;
        }
        if let Err(e) = self.try_append(entries) {
            tracing::warn!(path = %self.path.display(), error = ?e,
                "could not append to entries log");
        }
    }

    fn try_append(&self, entries: &[FeedEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;

        let ts = Utc::now();
        let mut buf = String::new();
        for entry in entries {
            let record = EntryRecord {
                ts,
                title: &entry.title,
                reward: reward::extract(&entry.title, &entry.summary),
                link: entry.link.as_deref(),
                summary: &entry.summary,
            };
            buf.push_str(&serde_json::to_string(&record).context("serializing entry record")?);
            buf.push('\n');
        }
        file.write_all(buf.as_bytes())
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}
