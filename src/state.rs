// src/state.rs
//! Durable watch state: the watermark and the lifetime notification counter.
//!
//! The record is tiny and human-inspectable JSON. It is loaded once at
//! startup and rewritten after every commit; a corrupt or missing file is a
//! recoverable condition, not a fatal one.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchState {
    /// Link of the most recently processed entry; the sole continuation
    /// token across polls. Advances only.
    pub last_seen_link: Option<String>,
    /// Lifetime count of entries that triggered an alert.
    pub total_notified: u64,
}

/// Owns the state record and its on-disk home. The watcher task is the only
/// mutator.
#[derive(Debug)]
pub struct StateFile {
    path: PathBuf,
    state: WatchState,
}

impl StateFile {
    /// Load state from `path`. A missing file starts fresh; a malformed file
    /// is logged and also starts fresh.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e,
                        "state file malformed, starting fresh");
                    WatchState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => WatchState::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e,
                    "state file unreadable, starting fresh");
                WatchState::default()
            }
        };
        Self { path, state }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    pub fn last_seen_link(&self) -> Option<&str> {
        self.state.last_seen_link.as_deref()
    }

    pub fn total_notified(&self) -> u64 {
        self.state.total_notified
    }

    /// Advance the watermark to `new_watermark` and add `notified_delta` to
    /// the lifetime counter, then persist both fields together.
    ///
    /// Called only when at least one entry advanced the watermark; an empty
    /// batch never touches the file. A failed write is logged and the loop
    /// continues with in-memory state; the next commit retries the write.
    pub fn commit(&mut self, new_watermark: &str, notified_delta: u64) {
        self.state.last_seen_link = Some(new_watermark.to_string());
        self.state.total_notified += notified_delta;
        if let Err(e) = self.save() {
            tracing::error!(path = %self.path.display(), error = %e,
                "could not persist watch state");
        }
    }

    /// Write the record as one atomic replace: serialize to a sibling temp
    /// file, then rename over the real one.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(&self.state).context("serializing watch state")?;
        fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let sf = StateFile::load(dir.path().join("state.json"));
        assert_eq!(sf.state(), &WatchState::default());
    }

    #[test]
    fn corrupt_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        let sf = StateFile::load(&path);
        assert_eq!(sf.last_seen_link(), None);
        assert_eq!(sf.total_notified(), 0);
    }

    #[test]
    fn commit_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut sf = StateFile::load(&path);
        sf.commit("https://example.test/jobs/42", 3);

        let reloaded = StateFile::load(&path);
        assert_eq!(reloaded.last_seen_link(), Some("https://example.test/jobs/42"));
        assert_eq!(reloaded.total_notified(), 3);
    }

    #[test]
    fn commit_same_watermark_twice_is_safe() {
        let dir = tempfile::tempdir().unwrap();
        let mut sf = StateFile::load(dir.path().join("state.json"));
        sf.commit("link-a", 1);
        sf.commit("link-a", 2);
        assert_eq!(sf.last_seen_link(), Some("link-a"));
        assert_eq!(sf.total_notified(), 3);
    }
}
