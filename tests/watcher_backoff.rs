// tests/watcher_backoff.rs
//
// Failure handling: exponential backoff with a ceiling, reset on recovery,
// and no state-file fallout from failed fetches.

mod common;

use common::{entry, fetch_failure, harness};
use std::time::Duration;

#[tokio::test]
async fn consecutive_failures_double_the_wait_up_to_the_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = harness(
        dir.path(),
        0.0,
        vec![
            fetch_failure(),
            fetch_failure(),
            fetch_failure(),
            fetch_failure(),
            fetch_failure(),
            fetch_failure(),
        ],
    );

    let mut waits = Vec::new();
    for _ in 0..6 {
        waits.push(h.watcher.poll_once().await.as_secs());
    }
    assert_eq!(waits, vec![31, 62, 124, 248, 300, 300]);
}

#[tokio::test]
async fn successful_fetch_resets_the_backoff() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = harness(
        dir.path(),
        0.0,
        vec![
            fetch_failure(),
            fetch_failure(),
            Ok(vec![entry("e1", "Job one")]),
            fetch_failure(),
        ],
    );

    assert_eq!(h.watcher.poll_once().await.as_secs(), 31);
    assert_eq!(h.watcher.poll_once().await.as_secs(), 62);
    // Recovery: back to the base interval, counter cleared.
    assert_eq!(h.watcher.poll_once().await.as_secs(), 31);
    // The next failure starts the sequence over.
    assert_eq!(h.watcher.poll_once().await.as_secs(), 31);
}

#[tokio::test]
async fn failed_fetches_leave_state_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = harness(dir.path(), 0.0, vec![fetch_failure(), fetch_failure()]);

    h.watcher.poll_once().await;
    h.watcher.poll_once().await;

    assert_eq!(h.watcher.state().last_seen_link(), None);
    assert!(!dir.path().join("state.json").exists());
    assert!(h.sink.delivered().is_empty());
}

#[tokio::test]
async fn recovery_after_failures_still_diffs_correctly() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = harness(
        dir.path(),
        0.0,
        vec![
            Ok(vec![entry("e2", "Job two"), entry("e1", "Job one")]),
            fetch_failure(),
            Ok(vec![
                entry("e4", "Job four | Reward: $6.00"),
                entry("e3", "Job three | Reward: $4.00"),
                entry("e2", "Job two"),
            ]),
        ],
    );

    h.watcher.poll_once().await; // primes at e2
    h.watcher.poll_once().await; // failure, backoff
    let wait = h.watcher.poll_once().await;

    assert_eq!(wait, Duration::from_secs(31));
    let delivered = h.sink.delivered();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].url.as_deref(), Some("e3"));
    assert_eq!(delivered[1].url.as_deref(), Some("e4"));
    assert_eq!(h.watcher.state().last_seen_link(), Some("e4"));
    assert_eq!(h.watcher.state().total_notified(), 2);
}
