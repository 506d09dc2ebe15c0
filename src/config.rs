// src/config.rs
//! Typed application configuration.
//!
//! Loaded from a TOML file (default `jobwatcher.toml`, overridable via the
//! `JOBWATCHER_CONFIG` env var). Every field has a default, so a partial
//! file is fine; a missing file is written out with the defaults so there is
//! something to edit. Out-of-range values are clamped at load time with a
//! logged fallback rather than rejected.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

pub const ENV_CONFIG_PATH: &str = "JOBWATCHER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "jobwatcher.toml";

/// Config shared between the watcher task (reader) and the command surface
/// (owner/mutator).
pub type SharedConfig = Arc<RwLock<AppConfig>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub watcher: WatcherCfg,
    pub network: NetworkCfg,
    pub paths: PathsCfg,
    pub logging: LoggingCfg,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatcherCfg {
    pub feed_url: String,
    pub check_interval_secs: u64,
    /// Minimum reward for an entry to alert; 0.0 disables the filter.
    pub min_reward: f64,
    pub enable_notifications: bool,
    pub enable_sound: bool,
    pub use_custom_user_agent: bool,
}

impl Default for WatcherCfg {
    fn default() -> Self {
        Self {
            feed_url: "https://www.theguardian.com/uk/rss".to_string(),
            check_interval_secs: 31,
            min_reward: 0.0,
            enable_notifications: true,
            enable_sound: true,
            use_custom_user_agent: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkCfg {
    pub max_backoff_secs: u64,
    pub fetch_timeout_secs: u64,
    pub user_agent_email: String,
}

impl Default for NetworkCfg {
    fn default() -> Self {
        Self {
            max_backoff_secs: 300,
            fetch_timeout_secs: 10,
            user_agent_email: "your_email@example.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsCfg {
    pub state_file: String,
    pub sound_file: String,
    pub notification_icon: String,
    /// Custom browser executable; empty means the system default opener.
    pub browser_path: String,
    /// Argument template for the custom browser; `{url}` is substituted.
    pub browser_args: String,
    pub entries_log: String,
    pub log_dir: String,
    pub pause_file: String,
}

impl Default for PathsCfg {
    fn default() -> Self {
        Self {
            state_file: "state.json".to_string(),
            sound_file: "alert.wav".to_string(),
            notification_icon: String::new(),
            browser_path: String::new(),
            browser_args: "--new-window {url}".to_string(),
            entries_log: "logs/entries.jsonl".to_string(),
            log_dir: "logs".to_string(),
            pause_file: "jobwatcher.pause".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingCfg {
    pub file_enabled: bool,
    pub entries_log_enabled: bool,
}

impl Default for LoggingCfg {
    fn default() -> Self {
        Self {
            file_enabled: true,
            entries_log_enabled: true,
        }
    }
}

impl AppConfig {
    /// Resolve the config path: `$JOBWATCHER_CONFIG`, else the default.
    pub fn resolve_path() -> PathBuf {
        std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load from `path`, writing a default file first if none exists.
    /// A file that exists but does not parse is an error; silently running
    /// with defaults against an edited file would be worse than stopping.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let defaults = Self::default();
            defaults
                .save(path)
                .with_context(|| format!("writing default config to {}", path.display()))?;
            tracing::info!(path = %path.display(), "created default config file");
            return Ok(defaults);
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.validate();
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let body = toml::to_string_pretty(self).context("serializing config")?;
        fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Clamp out-of-range values, logging each fallback.
    pub fn validate(&mut self) {
        if self.watcher.check_interval_secs < 5 {
            tracing::warn!(
                got = self.watcher.check_interval_secs,
                "check_interval_secs below 5, clamping"
            );
            self.watcher.check_interval_secs = 5;
        }
        if self.watcher.min_reward < 0.0 {
            tracing::warn!(got = self.watcher.min_reward, "negative min_reward, using 0.0");
            self.watcher.min_reward = 0.0;
        }
        if self.network.max_backoff_secs < self.watcher.check_interval_secs {
            tracing::warn!(
                got = self.network.max_backoff_secs,
                "max_backoff_secs below check interval, raising"
            );
            self.network.max_backoff_secs = self.watcher.check_interval_secs;
        }
        self.network.fetch_timeout_secs = self.network.fetch_timeout_secs.clamp(1, 120);
    }

    /// User-Agent header value, when the custom one is enabled.
    pub fn user_agent(&self) -> Option<String> {
        self.watcher.use_custom_user_agent.then(|| {
            format!(
                "jobwatcher/{} ({})",
                env!("CARGO_PKG_VERSION"),
                self.network.user_agent_email
            )
        })
    }
}
