// tests/watcher_loop.rs
//
// Poll-cycle behavior against a scripted feed: priming, chronological
// alerting, threshold filtering, pause, manual check, shutdown persistence.

mod common;

use common::{entry, harness};
use std::time::{Duration, Instant};

/// Spin until `cond` holds or the deadline passes.
async fn wait_until(cond: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

#[tokio::test]
async fn first_successful_poll_primes_without_alerts() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = harness(
        dir.path(),
        0.0,
        vec![Ok(vec![
            entry("e3", "Job three | Reward: $3.00"),
            entry("e2", "Job two | Reward: $2.00"),
            entry("e1", "Job one | Reward: $1.00"),
        ])],
    );

    let wait = h.watcher.poll_once().await;
    assert_eq!(wait, Duration::from_secs(31));

    assert!(h.sink.delivered().is_empty(), "priming must not alert");
    assert_eq!(h.watcher.state().last_seen_link(), Some("e3"));
    assert_eq!(h.watcher.state().total_notified(), 0);
}

#[tokio::test]
async fn new_entries_alert_oldest_first_and_advance_watermark() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = harness(
        dir.path(),
        0.0,
        vec![
            // Priming batch.
            Ok(vec![
                entry("e3", "Job three"),
                entry("e2", "Job two"),
                entry("e1", "Job one"),
            ]),
            // Two entries arrived since e3.
            Ok(vec![
                entry("e5", "Job five | Reward: $9.00"),
                entry("e4", "Job four | Reward: $7.50"),
                entry("e3", "Job three"),
            ]),
        ],
    );

    h.watcher.poll_once().await;
    h.watcher.poll_once().await;

    let delivered = h.sink.delivered();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].url.as_deref(), Some("e4"));
    assert_eq!(delivered[1].url.as_deref(), Some("e5"));

    assert_eq!(h.watcher.state().last_seen_link(), Some("e5"));
    assert_eq!(h.watcher.state().total_notified(), 2);
}

#[tokio::test]
async fn below_threshold_batch_advances_watermark_without_alerts() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = harness(
        dir.path(),
        5.0,
        vec![
            Ok(vec![entry("e1", "Job one")]),
            Ok(vec![
                entry("e3", "Job three | Reward: $2.00"),
                entry("e2", "Job two | Reward: $1.50"),
                entry("e1", "Job one"),
            ]),
        ],
    );

    h.watcher.poll_once().await;
    h.watcher.poll_once().await;

    assert!(h.sink.delivered().is_empty());
    // Filtered entries are still marked seen and never reconsidered.
    assert_eq!(h.watcher.state().last_seen_link(), Some("e3"));
    assert_eq!(h.watcher.state().total_notified(), 0);
}

#[tokio::test]
async fn threshold_filters_delivery_but_counts_passing_entries() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = harness(
        dir.path(),
        5.0,
        vec![
            Ok(vec![entry("e1", "Job one")]),
            Ok(vec![
                entry("e3", "Job three | Reward: $12.00"),
                entry("e2", "Job two | Reward: $1.00"),
                entry("e1", "Job one"),
            ]),
        ],
    );

    h.watcher.poll_once().await;
    h.watcher.poll_once().await;

    let delivered = h.sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].url.as_deref(), Some("e3"));
    assert_eq!(h.watcher.state().total_notified(), 1);
    assert_eq!(h.watcher.state().last_seen_link(), Some("e3"));
}

#[tokio::test]
async fn empty_feed_never_touches_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = harness(dir.path(), 0.0, vec![Ok(Vec::new())]);

    h.watcher.poll_once().await;

    assert_eq!(h.watcher.state().last_seen_link(), None);
    assert!(!dir.path().join("state.json").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn run_primes_then_saves_state_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(
        dir.path(),
        0.0,
        vec![Ok(vec![entry("e1", "Job one")])],
    );
    let controls = h.controls.clone();
    let source = h.source.clone();
    let state_path = dir.path().join("state.json");

    let task = tokio::spawn(h.watcher.run());
    assert!(wait_until(|| source.fetch_count() >= 1, Duration::from_secs(5)).await);

    controls.shutdown();
    task.await.unwrap();

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&state_path).unwrap()).unwrap();
    assert_eq!(saved["last_seen_link"], "e1");
    assert_eq!(saved["total_notified"], 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn manual_check_preempts_the_interval_wait() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(
        dir.path(),
        0.0,
        vec![
            Ok(vec![entry("e1", "Job one")]), // priming fetch
            Ok(vec![entry("e1", "Job one")]), // first cycle
        ],
    );
    let controls = h.controls.clone();
    let source = h.source.clone();

    let task = tokio::spawn(h.watcher.run());
    // Priming plus the immediate first cycle; the 31 s wait follows.
    assert!(wait_until(|| source.fetch_count() >= 2, Duration::from_secs(5)).await);

    controls.request_check();
    assert!(
        wait_until(|| source.fetch_count() >= 3, Duration::from_secs(5)).await,
        "manual check should pre-empt the interval wait"
    );

    controls.shutdown();
    task.await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn paused_watcher_does_not_fetch() {
    let dir = tempfile::tempdir().unwrap();
    // Pre-seed the watermark so run() skips priming.
    std::fs::write(
        dir.path().join("state.json"),
        r#"{ "last_seen_link": "e1", "total_notified": 0 }"#,
    )
    .unwrap();

    let h = harness(dir.path(), 0.0, vec![Ok(vec![entry("e1", "Job one")])]);
    h.controls.pause().unwrap();
    let controls = h.controls.clone();
    let source = h.source.clone();

    let task = tokio::spawn(h.watcher.run());
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(source.fetch_count(), 0, "paused cycles must not fetch");

    controls.resume().unwrap();
    controls.request_check();
    assert!(wait_until(|| source.fetch_count() >= 1, Duration::from_secs(5)).await);

    controls.shutdown();
    task.await.unwrap();
}
