// src/control.rs
//! Control surface for the watcher task: manual check, pause marker,
//! shutdown. These are the only concurrent inputs into the poll loop, and
//! all of them go through thread-safe signaling rather than shared mutable
//! data.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{watch, Notify};

#[derive(Debug, Clone)]
pub struct ControlHandle {
    check_now: Arc<Notify>,
    shutdown_tx: watch::Sender<bool>,
    pause_file: PathBuf,
}

impl ControlHandle {
    pub fn new(pause_file: impl Into<PathBuf>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            check_now: Arc::new(Notify::new()),
            shutdown_tx,
            pause_file: pause_file.into(),
        }
    }

    /// Pre-empt the current wait and poll immediately.
    pub fn request_check(&self) {
        self.check_now.notify_one();
    }

    /// Resolves when a manual check has been requested. A request issued
    /// while the loop was busy is not lost; the stored permit resolves the
    /// next call immediately.
    pub async fn check_requested(&self) {
        self.check_now.notified().await;
    }

    /// Request shutdown. Safe to call from any thread, any number of times;
    /// repeated requests collapse into one.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn shutdown_requested(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Pausing is expressed as the presence of a marker file, so it survives
    /// restarts and can be toggled from outside the process too.
    pub fn is_paused(&self) -> bool {
        self.pause_file.exists()
    }

    pub fn pause(&self) -> std::io::Result<()> {
        std::fs::write(&self.pause_file, b"")
    }

    pub fn resume(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.pause_file) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
