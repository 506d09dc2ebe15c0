// src/notify/browser.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Command;

use super::{AlertSink, JobAlert};
use crate::config::SharedConfig;

/// Opens the alert's link, either with a configured browser executable and
/// argument template or with the system default opener.
pub struct BrowserOpener {
    config: SharedConfig,
}

impl BrowserOpener {
    pub fn new(config: SharedConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl AlertSink for BrowserOpener {
    async fn deliver(&self, alert: &JobAlert) -> Result<()> {
        let Some(url) = alert.url.as_deref() else {
            tracing::debug!("alert without url, nothing to open");
            return Ok(());
        };

        let (browser_path, browser_args) = {
            let cfg = self.config.read().expect("config lock poisoned");
            (cfg.paths.browser_path.clone(), cfg.paths.browser_args.clone())
        };

        if browser_path.is_empty() || !Path::new(&browser_path).is_file() {
            open::that_detached(url).context("opening url with default browser")?;
            return Ok(());
        }

        // Each whitespace-separated token of the template is one argument;
        // `{url}` is substituted wherever it appears.
        let args: Vec<String> = browser_args
            .split_whitespace()
            .map(|a| a.replace("{url}", url))
            .collect();
        Command::new(&browser_path)
            .args(&args)
            .spawn()
            .with_context(|| format!("launching {browser_path}"))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}
