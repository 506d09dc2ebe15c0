// src/notify/desktop.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

use super::{AlertSink, JobAlert};
use crate::config::SharedConfig;

const APP_NAME: &str = "jobwatcher";
const TIMEOUT_MS: u32 = 8_000;

/// Desktop notification via the platform notification daemon.
pub struct DesktopNotifier {
    config: SharedConfig,
}

impl DesktopNotifier {
    pub fn new(config: SharedConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl AlertSink for DesktopNotifier {
    async fn deliver(&self, alert: &JobAlert) -> Result<()> {
        let icon = {
            let cfg = self.config.read().expect("config lock poisoned");
            cfg.paths.notification_icon.clone()
        };
        let summary = alert.title.clone();
        let body = alert.message.clone();

        // The notification call talks to a session daemon and can stall;
        // keep it off the async workers.
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut notification = notify_rust::Notification::new();
            notification
                .summary(&summary)
                .body(&body)
                .appname(APP_NAME)
                .timeout(notify_rust::Timeout::Milliseconds(TIMEOUT_MS));
            if !icon.is_empty() && Path::new(&icon).is_file() {
                notification.icon(&icon);
            }
            notification.show().context("showing desktop notification")?;
            Ok(())
        })
        .await
        .context("notification task join")?
    }

    fn name(&self) -> &'static str {
        "desktop"
    }
}
