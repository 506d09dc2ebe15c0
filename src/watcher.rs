// src/watcher.rs
//! The poll loop: fetch → diff → filter → alert → commit, with exponential
//! backoff under fetch failure, a pause marker, and pre-emptible waits.

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::SharedConfig;
use crate::control::ControlHandle;
use crate::diff;
use crate::entry_log::EntryLog;
use crate::feed::{self, FeedEntry, FeedSource};
use crate::notify::{AlertSink, JobAlert};
use crate::reward;
use crate::state::StateFile;

/// How often a paused watcher re-checks the pause marker.
const PAUSE_RECHECK: Duration = Duration::from_secs(5);

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("watcher_polls_total", "Poll cycles started.");
        describe_counter!("watcher_fetch_failures_total", "Feed fetches that failed.");
        describe_counter!("watcher_entries_new_total", "Entries classified as new.");
        describe_counter!("watcher_alerts_total", "Entries that triggered an alert.");
        describe_counter!("feed_entries_total", "Entries parsed out of fetched feeds.");
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
    });
}

/// What the loop is doing right now, for the status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Initializing,
    Priming,
    Fetching,
    Processing,
    Waiting,
    Paused,
    Backoff(u64),
    Stopped,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Initializing => write!(f, "initializing"),
            Action::Priming => write!(f, "priming feed"),
            Action::Fetching => write!(f, "fetching"),
            Action::Processing => write!(f, "processing"),
            Action::Waiting => write!(f, "waiting"),
            Action::Paused => write!(f, "paused"),
            Action::Backoff(secs) => write!(f, "backoff ({secs}s)"),
            Action::Stopped => write!(f, "stopped"),
        }
    }
}

/// Point-in-time view of the watcher, readable from the command surface.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub action: Action,
    pub started_at: DateTime<Utc>,
    pub last_check: Option<DateTime<Utc>>,
    pub failure_count: u32,
    pub session_new_entries: u64,
    pub session_total_value: f64,
    pub total_notified: u64,
    pub last_seen_link: Option<String>,
}

#[derive(Clone)]
pub struct StatusHandle {
    inner: Arc<Mutex<StatusSnapshot>>,
}

impl StatusHandle {
    fn new(total_notified: u64, last_seen_link: Option<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StatusSnapshot {
                action: Action::Initializing,
                started_at: Utc::now(),
                last_check: None,
                failure_count: 0,
                session_new_entries: 0,
                session_total_value: 0.0,
                total_notified,
                last_seen_link,
            })),
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.lock().expect("status mutex poisoned").clone()
    }

    fn update(&self, f: impl FnOnce(&mut StatusSnapshot)) {
        let mut snap = self.inner.lock().expect("status mutex poisoned");
        f(&mut snap);
    }
}

/// Wait before retrying after `consecutive_failures` fetch failures in a row:
/// `base * 2^(n-1)`, capped at `max_backoff_secs`. The counter lives in
/// memory only; a restart always begins calm.
pub fn backoff_delay(base_secs: u64, consecutive_failures: u32, max_backoff_secs: u64) -> Duration {
    let exp = consecutive_failures.saturating_sub(1).min(32);
    let raw = base_secs.saturating_mul(1u64 << exp);
    Duration::from_secs(raw.min(max_backoff_secs))
}

/// The single task that owns the poll state machine. Sole mutator of the
/// durable state and the failure counter; the control surface only signals.
pub struct Watcher {
    config: SharedConfig,
    state: StateFile,
    source: Arc<dyn FeedSource>,
    alerts: Arc<dyn AlertSink>,
    controls: ControlHandle,
    entry_log: Option<EntryLog>,
    status: StatusHandle,
    failure_count: u32,
}

impl Watcher {
    pub fn new(
        config: SharedConfig,
        state: StateFile,
        source: Arc<dyn FeedSource>,
        alerts: Arc<dyn AlertSink>,
        controls: ControlHandle,
    ) -> Self {
        ensure_metrics_described();
        let entry_log = {
            let cfg = config.read().expect("config lock poisoned");
            cfg.logging
                .entries_log_enabled
                .then(|| EntryLog::new(cfg.paths.entries_log.clone()))
        };
        let status = StatusHandle::new(
            state.total_notified(),
            state.last_seen_link().map(str::to_string),
        );
        Self {
            config,
            state,
            source,
            alerts,
            controls,
            entry_log,
            status,
            failure_count: 0,
        }
    }

    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    pub fn state(&self) -> &StateFile {
        &self.state
    }

    fn set_action(&self, action: Action) {
        self.status.update(|s| s.action = action);
    }

    /// Drive the loop until shutdown is requested. Waits are pre-empted by a
    /// manual check request or by shutdown; the pause marker suspends
    /// fetching without advancing backoff.
    pub async fn run(mut self) {
        if self.state.last_seen_link().is_none() {
            self.prime().await;
        }

        let mut shutdown_rx = self.controls.shutdown_receiver();
        let mut wait = Duration::ZERO;
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = self.controls.check_requested() => {}
                _ = tokio::time::sleep(wait) => {}
            }
            if self.controls.shutdown_requested() {
                break;
            }

            wait = if self.controls.is_paused() {
                self.set_action(Action::Paused);
                PAUSE_RECHECK
            } else {
                self.poll_once().await
            };
        }

        tracing::info!("shutdown requested, saving state");
        self.set_action(Action::Stopped);
        if let Err(e) = self.state.save() {
            tracing::error!(error = ?e, "could not save state on shutdown");
        }
    }

    /// One-time watermark initialization: mark the feed's current contents
    /// as seen without alerting on any of them. A failed priming fetch is
    /// not a backoff event; the first successful poll primes instead.
    async fn prime(&mut self) {
        self.set_action(Action::Priming);
        match self.source.fetch().await {
            Ok(entries) => {
                self.process_entries(entries).await;
                tracing::info!("initial feed primed");
            }
            Err(e) => {
                tracing::warn!(error = %e,
                    "priming fetch failed; first successful poll will prime");
            }
        }
    }

    /// One fetch/process cycle. Returns how long to wait before the next
    /// one: the base interval after success, the backoff delay after a
    /// failure.
    pub async fn poll_once(&mut self) -> Duration {
        counter!("watcher_polls_total").increment(1);
        self.set_action(Action::Fetching);

        let (base, max_backoff) = {
            let cfg = self.config.read().expect("config lock poisoned");
            (cfg.watcher.check_interval_secs, cfg.network.max_backoff_secs)
        };

        match self.source.fetch().await {
            Ok(entries) => {
                if self.failure_count > 0 {
                    tracing::info!("connection re-established");
                }
                self.failure_count = 0;
                self.status.update(|s| {
                    s.failure_count = 0;
                    s.last_check = Some(Utc::now());
                });
                self.set_action(Action::Processing);
                self.process_entries(entries).await;
                self.set_action(Action::Waiting);
                Duration::from_secs(base)
            }
            Err(e) => {
                self.failure_count += 1;
                counter!("watcher_fetch_failures_total").increment(1);
                let delay = backoff_delay(base, self.failure_count, max_backoff);
                tracing::warn!(error = %e, failures = self.failure_count,
                    delay_secs = delay.as_secs(), "feed fetch failed, backing off");
                self.status.update(|s| s.failure_count = self.failure_count);
                self.set_action(Action::Backoff(delay.as_secs()));
                delay
            }
        }
    }

    /// Diff against the watermark, alert on qualifying entries in
    /// chronological order, then commit watermark + counter atomically.
    async fn process_entries(&mut self, entries: Vec<FeedEntry>) {
        if entries.is_empty() {
            return;
        }
        if let Some(log) = &self.entry_log {
            log.append(&entries);
        }

        let fresh = diff::new_entries(&entries, self.state.last_seen_link());
        let Some(newest_link) = fresh.last().and_then(|e| e.link.clone()) else {
            return;
        };
        counter!("watcher_entries_new_total").increment(fresh.len() as u64);

        if self.state.last_seen_link().is_none() {
            // First contact with this feed: everything it currently carries
            // is pre-existing, not new. Mark seen, alert on nothing.
            tracing::info!(entries = fresh.len(), "feed primed, current entries marked seen");
            self.state.commit(&newest_link, 0);
            self.status.update(|s| s.last_seen_link = Some(newest_link));
            return;
        }

        let min_reward = {
            let cfg = self.config.read().expect("config lock poisoned");
            cfg.watcher.min_reward
        };

        let mut notified = 0u64;
        for entry in &fresh {
            let value = reward::extract(&entry.title, &entry.summary);
            if min_reward > 0.0 && value < min_reward {
                tracing::debug!(title = %entry.title, value, min_reward,
                    "below reward threshold, not alerting");
                continue;
            }

            notified += 1;
            let display_title = feed::normalize_text(&entry.title);
            let headline = display_title
                .split('|')
                .next()
                .unwrap_or(&display_title)
                .trim()
                .to_string();
            tracing::info!(title = %headline, reward = value, "new job");
            counter!("watcher_alerts_total").increment(1);

            let alert = JobAlert {
                title: "New job available".to_string(),
                message: display_title,
                url: entry.link.clone(),
            };
            if let Err(e) = self.alerts.deliver(&alert).await {
                tracing::warn!(error = ?e, "alert dispatch failed");
            }
            self.status.update(|s| {
                s.session_new_entries += 1;
                s.session_total_value += value;
            });
        }

        // Filtering affects delivery only: entries below the threshold are
        // still marked seen and will not be reconsidered next poll.
        self.state.commit(&newest_link, notified);
        let total = self.state.total_notified();
        self.status.update(|s| {
            s.total_notified = total;
            s.last_seen_link = Some(newest_link);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_base_then_caps() {
        let waits: Vec<u64> = (1..=7)
            .map(|n| backoff_delay(31, n, 300).as_secs())
            .collect();
        assert_eq!(waits, vec![31, 62, 124, 248, 300, 300, 300]);
    }

    #[test]
    fn backoff_survives_absurd_failure_counts() {
        assert_eq!(backoff_delay(31, 1_000, 300).as_secs(), 300);
        assert_eq!(backoff_delay(u64::MAX, 40, 300).as_secs(), 300);
    }

    #[test]
    fn action_display_is_compact() {
        assert_eq!(Action::Backoff(62).to_string(), "backoff (62s)");
        assert_eq!(Action::Waiting.to_string(), "waiting");
    }
}
