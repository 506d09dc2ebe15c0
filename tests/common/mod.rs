// tests/common/mod.rs
//
// Shared test doubles: a scripted feed source and a recording alert sink.
// Not every test binary uses every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use jobwatcher::config::{AppConfig, SharedConfig};
use jobwatcher::control::ControlHandle;
use jobwatcher::feed::{FeedEntry, FeedSource, FetchError};
use jobwatcher::notify::{AlertSink, JobAlert};
use jobwatcher::state::StateFile;
use jobwatcher::watcher::Watcher;

pub fn entry(link: &str, title: &str) -> FeedEntry {
    FeedEntry {
        link: Some(link.to_string()),
        title: title.to_string(),
        summary: String::new(),
        published_at: 0,
    }
}

/// Feed source that replays a scripted sequence of fetch results, then
/// returns empty feeds.
pub struct ScriptedSource {
    batches: Mutex<VecDeque<Result<Vec<FeedEntry>, FetchError>>>,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(batches: Vec<Result<Vec<FeedEntry>, FetchError>>) -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(batches.into()),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for ScriptedSource {
    async fn fetch(&self) -> Result<Vec<FeedEntry>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub fn fetch_failure() -> Result<Vec<FeedEntry>, FetchError> {
    Err(FetchError::Status(
        reqwest::StatusCode::INTERNAL_SERVER_ERROR,
    ))
}

/// Alert sink that records every delivery.
#[derive(Default)]
pub struct RecordingSink {
    alerts: Mutex<Vec<JobAlert>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn delivered(&self) -> Vec<JobAlert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn deliver(&self, alert: &JobAlert) -> anyhow::Result<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

pub fn test_config(dir: &Path, min_reward: f64) -> SharedConfig {
    let mut cfg = AppConfig::default();
    cfg.watcher.check_interval_secs = 31;
    cfg.watcher.min_reward = min_reward;
    cfg.network.max_backoff_secs = 300;
    cfg.logging.entries_log_enabled = false;
    cfg.logging.file_enabled = false;
    cfg.paths.state_file = dir.join("state.json").to_string_lossy().into_owned();
    cfg.paths.pause_file = dir.join("watch.pause").to_string_lossy().into_owned();
    Arc::new(RwLock::new(cfg))
}

pub struct Harness {
    pub watcher: Watcher,
    pub source: Arc<ScriptedSource>,
    pub sink: Arc<RecordingSink>,
    pub controls: ControlHandle,
    pub config: SharedConfig,
}

pub fn harness(
    dir: &Path,
    min_reward: f64,
    batches: Vec<Result<Vec<FeedEntry>, FetchError>>,
) -> Harness {
    let config = test_config(dir, min_reward);
    let source = ScriptedSource::new(batches);
    let sink = RecordingSink::new();
    let (state_path, pause_path) = {
        let cfg = config.read().unwrap();
        (cfg.paths.state_file.clone(), cfg.paths.pause_file.clone())
    };
    let controls = ControlHandle::new(pause_path);
    let watcher = Watcher::new(
        config.clone(),
        StateFile::load(state_path),
        source.clone(),
        sink.clone(),
        controls.clone(),
    );
    Harness {
        watcher,
        source,
        sink,
        controls,
        config,
    }
}
