//! Jobwatcher binary entrypoint.
//! Boots the watcher task, wires the control surface, and runs a
//! line-oriented command prompt on stdin until shutdown.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jobwatcher::config::AppConfig;
use jobwatcher::control::ControlHandle;
use jobwatcher::feed::rss::HttpFeedSource;
use jobwatcher::notify::{AlertMux, AlertSink, JobAlert};
use jobwatcher::state::StateFile;
use jobwatcher::watcher::{StatusHandle, Watcher};
use jobwatcher::SharedConfig;

/// Compact stdout logs, plus a daily-rolling file when enabled. The returned
/// guard must stay alive for the file writer to flush.
fn init_tracing(cfg: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("jobwatcher=info,warn"));
    let stdout_layer = fmt::layer().compact();

    if cfg.logging.file_enabled {
        let appender = tracing_appender::rolling::daily(&cfg.paths.log_dir, "jobwatcher.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .with(fmt::layer().with_writer(writer).with_ansi(false))
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .init();
        None
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op elsewhere. Enables JOBWATCHER_CONFIG.
    let _ = dotenvy::dotenv();

    let config_path = AppConfig::resolve_path();
    let cfg = AppConfig::load_or_create(&config_path)?;
    let _log_guard = init_tracing(&cfg);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        feed = %cfg.watcher.feed_url,
        "jobwatcher starting"
    );

    let state = StateFile::load(&cfg.paths.state_file);
    let controls = ControlHandle::new(&cfg.paths.pause_file);

    let mut source = HttpFeedSource::new(cfg.watcher.feed_url.clone())
        .with_timeout(cfg.network.fetch_timeout_secs);
    if let Some(ua) = cfg.user_agent() {
        source = source.with_user_agent(ua);
    }

    let shared: SharedConfig = Arc::new(RwLock::new(cfg));
    let alerts = Arc::new(AlertMux::from_config(shared.clone()));

    let watcher = Watcher::new(
        shared.clone(),
        state,
        Arc::new(source),
        alerts.clone(),
        controls.clone(),
    );
    let status = watcher.status();
    let watcher_task = tokio::spawn(watcher.run());

    // Ctrl-C folds into the same idempotent shutdown path as `exit`.
    {
        let controls = controls.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                controls.shutdown();
            }
        });
    }

    run_repl(&config_path, &shared, &controls, &alerts, &status).await;

    controls.shutdown();
    watcher_task.await.context("watcher task panicked")?;

    let cfg_snapshot = shared.read().expect("config lock poisoned").clone();
    if let Err(e) = cfg_snapshot.save(&config_path) {
        tracing::warn!(error = ?e, "could not save config on exit");
    }
    println!("Jobwatcher has shut down.");
    Ok(())
}

/// Read commands until shutdown. A closed stdin (piped/daemonized run) stops
/// command handling but leaves the watcher running until a signal arrives.
async fn run_repl(
    config_path: &Path,
    config: &SharedConfig,
    controls: &ControlHandle,
    alerts: &Arc<AlertMux>,
    status: &StatusHandle,
) {
    let mut shutdown_rx = controls.shutdown_receiver();
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    println!("Type 'help' for commands.");

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if handle_command(line.trim(), config_path, config, controls, alerts, status).await {
                        break;
                    }
                }
                Ok(None) => {
                    let _ = shutdown_rx.changed().await;
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed, commands disabled");
                    let _ = shutdown_rx.changed().await;
                    break;
                }
            }
        }
    }
}

/// Returns true when the loop should exit.
async fn handle_command(
    line: &str,
    config_path: &Path,
    config: &SharedConfig,
    controls: &ControlHandle,
    alerts: &Arc<AlertMux>,
    status: &StatusHandle,
) -> bool {
    let mut parts = line.split_whitespace();
    let Some(cmd) = parts.next() else {
        return false;
    };
    let arg = parts.next();

    match cmd {
        "exit" | "quit" | "q" => {
            controls.shutdown();
            return true;
        }
        "check" => {
            controls.request_check();
            println!("Check requested.");
        }
        "pause" | "p" => match controls.pause() {
            Ok(()) => println!("Paused. Feed checks are suspended."),
            Err(e) => println!("Could not pause: {e}"),
        },
        "resume" | "r" => match controls.resume() {
            Ok(()) => {
                controls.request_check();
                println!("Resumed.");
            }
            Err(e) => println!("Could not resume: {e}"),
        },
        "status" => print_status(config, controls, status),
        "setminreward" | "smr" => match arg.and_then(|a| a.parse::<f64>().ok()) {
            Some(v) if v >= 0.0 => {
                config.write().expect("config lock poisoned").watcher.min_reward = v;
                println!("Minimum reward set to {v:.2}.");
            }
            _ => println!("Usage: setminreward <non-negative number>"),
        },
        "togglesound" | "ts" => {
            let on = {
                let mut cfg = config.write().expect("config lock poisoned");
                cfg.watcher.enable_sound = !cfg.watcher.enable_sound;
                cfg.watcher.enable_sound
            };
            println!("Sound alerts {}.", if on { "enabled" } else { "disabled" });
        }
        "togglenotifications" | "tn" => {
            let on = {
                let mut cfg = config.write().expect("config lock poisoned");
                cfg.watcher.enable_notifications = !cfg.watcher.enable_notifications;
                cfg.watcher.enable_notifications
            };
            println!("Desktop notifications {}.", if on { "enabled" } else { "disabled" });
        }
        "notifytest" | "nt" => {
            let alert = JobAlert {
                title: "Jobwatcher test".to_string(),
                message: "This is a test notification!".to_string(),
                url: None,
            };
            match alerts.deliver(&alert).await {
                Ok(()) => println!("Test notification dispatched."),
                Err(e) => println!("Test notification failed: {e:#}"),
            }
        }
        "reload" | "rl" => match AppConfig::load_or_create(config_path) {
            Ok(new_cfg) => {
                *config.write().expect("config lock poisoned") = new_cfg;
                println!("Config reloaded. Feed URL and network settings apply after restart.");
            }
            Err(e) => println!("Reload failed: {e:#}"),
        },
        "help" => print_help(),
        other => println!("Unknown command '{other}'. Type 'help'."),
    }
    false
}

fn print_status(config: &SharedConfig, controls: &ControlHandle, status: &StatusHandle) {
    let s = status.snapshot();
    let cfg = config.read().expect("config lock poisoned");
    let uptime = (chrono::Utc::now() - s.started_at).num_seconds();
    println!("action:            {}", s.action);
    println!("paused:            {}", controls.is_paused());
    println!("uptime:            {uptime}s");
    match s.last_check {
        Some(ts) => println!("last check:        {}", ts.to_rfc3339()),
        None => println!("last check:        never"),
    }
    println!("consecutive fails: {}", s.failure_count);
    println!(
        "session:           {} entries, US$ {:.2} total",
        s.session_new_entries, s.session_total_value
    );
    println!("lifetime notified: {}", s.total_notified);
    println!(
        "last seen link:    {}",
        s.last_seen_link.as_deref().unwrap_or("<unset>")
    );
    println!("min reward:        {:.2}", cfg.watcher.min_reward);
}

fn print_help() {
    println!("Commands:");
    println!("  check                 Trigger an immediate feed check.");
    println!("  pause | p             Pause feed checks.");
    println!("  resume | r            Resume feed checks.");
    println!("  status                Show watcher status and session stats.");
    println!("  setminreward | smr    Set minimum reward (e.g. `smr 5.50`).");
    println!("  togglesound | ts      Toggle sound alerts.");
    println!("  togglenotifications | tn  Toggle desktop notifications.");
    println!("  notifytest | nt       Send a test notification.");
    println!("  reload | rl           Reload settings from the config file.");
    println!("  exit | quit | q       Save state and quit.");
}
