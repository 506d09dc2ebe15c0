// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod config;
pub mod control;
pub mod diff;
pub mod entry_log;
pub mod feed;
pub mod notify;
pub mod reward;
pub mod state;
pub mod watcher;

// ---- Re-exports for stable public API ----
pub use crate::config::{AppConfig, SharedConfig};
pub use crate::control::ControlHandle;
pub use crate::feed::{FeedEntry, FeedSource, FetchError};
pub use crate::notify::{AlertMux, AlertSink, JobAlert};
pub use crate::state::{StateFile, WatchState};
pub use crate::watcher::{StatusHandle, StatusSnapshot, Watcher};
