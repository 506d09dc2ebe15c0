// src/notify/mod.rs
pub mod browser;
pub mod desktop;
pub mod sound;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::SharedConfig;
pub use browser::BrowserOpener;
pub use desktop::DesktopNotifier;
pub use sound::SoundPlayer;

/// One qualifying feed entry, shaped for delivery.
#[derive(Debug, Clone)]
pub struct JobAlert {
    pub title: String,
    pub message: String,
    pub url: Option<String>,
}

/// A delivery channel for alerts. The watcher only inspects the result for
/// logging; failures never feed back into loop state.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, alert: &JobAlert) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Fans one alert out to every enabled channel as detached tasks, so the
/// poll loop never waits on a notification daemon, the sound card, or a
/// browser launch.
pub struct AlertMux {
    config: SharedConfig,
    desktop: Arc<DesktopNotifier>,
    sound: Arc<SoundPlayer>,
    browser: Arc<BrowserOpener>,
}

impl AlertMux {
    pub fn from_config(config: SharedConfig) -> Self {
        Self {
            desktop: Arc::new(DesktopNotifier::new(config.clone())),
            sound: Arc::new(SoundPlayer::new(config.clone())),
            browser: Arc::new(BrowserOpener::new(config.clone())),
            config,
        }
    }
}

fn spawn_delivery(sink: Arc<dyn AlertSink>, alert: JobAlert) {
    tokio::spawn(async move {
        if let Err(e) = sink.deliver(&alert).await {
            tracing::warn!(sink = sink.name(), error = ?e, "alert delivery failed");
        }
    });
}

#[async_trait]
impl AlertSink for AlertMux {
    /// Returns as soon as the per-channel tasks are spawned.
    async fn deliver(&self, alert: &JobAlert) -> Result<()> {
        let (notifications_on, sound_on) = {
            let cfg = self.config.read().expect("config lock poisoned");
            (cfg.watcher.enable_notifications, cfg.watcher.enable_sound)
        };

        if notifications_on {
            spawn_delivery(self.desktop.clone(), alert.clone());
        }
        if sound_on {
            spawn_delivery(self.sound.clone(), alert.clone());
        }
        if alert.url.is_some() {
            spawn_delivery(self.browser.clone(), alert.clone());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mux"
    }
}
