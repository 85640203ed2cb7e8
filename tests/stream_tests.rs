// Stream listener tests: message handling, reconnect timing, end-to-end SSE

mod common;

use common::{BackendState, spawn_backend, traffic_update_json, unreachable_base_url};
use ssm_dashboard::cache_store::CacheStore;
use ssm_dashboard::stream::{StreamListener, StreamState};
use ssm_dashboard::ui_state::{UiEvent, UiState};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;

type Parts = (Arc<StreamListener>, Arc<CacheStore>, Arc<UiState>);

fn listener(url: String, dir: &TempDir) -> Parts {
    listener_with_delay(url, dir, Duration::from_millis(5000))
}

fn listener_with_delay(url: String, dir: &TempDir, delay: Duration) -> Parts {
    let cache = Arc::new(CacheStore::new(dir.path(), Duration::from_secs(3600)));
    let ui = Arc::new(UiState::new(64));
    let stream = StreamListener::new(url, cache.clone(), ui.clone(), delay).unwrap();
    (Arc::new(stream), cache, ui)
}

#[tokio::test]
async fn test_traffic_update_replaces_live_users() {
    let dir = TempDir::new().unwrap();
    let (stream, cache, ui) = listener(unreachable_base_url(), &dir);
    let mut rx = ui.subscribe();

    assert!(stream.handle_message(&traffic_update_json()).await);
    let traffic = cache.traffic().await;
    assert_eq!(traffic.users.len(), 1);
    assert_eq!(traffic.users[0].username.as_deref(), Some("alice"));
    assert_eq!(traffic.users[0].port, Some(8388));
    assert_eq!(traffic.history.len(), 2);
    assert_eq!(traffic.history[1].total_used_gb, 2.0);
    assert_eq!(rx.try_recv().unwrap(), UiEvent::TrafficUpdated);
}

#[tokio::test]
async fn test_malformed_message_leaves_state_unchanged() {
    let dir = TempDir::new().unwrap();
    let (stream, cache, _ui) = listener(unreachable_base_url(), &dir);
    stream.handle_message(&traffic_update_json()).await;
    let before = cache.traffic().await;

    assert!(!stream.handle_message("{not json").await);
    assert!(!stream.handle_message(r#"{"type":"error","message":"boom"}"#).await);
    assert!(!stream.handle_message(r#"{"type":"heartbeat"}"#).await);
    assert_eq!(cache.traffic().await, before);
    assert_eq!(stream.state(), StreamState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_close_schedules_one_reconnect() {
    let dir = TempDir::new().unwrap();
    let (stream, _cache, ui) = listener(unreachable_base_url(), &dir);

    let generation = stream.begin_attempt();
    assert!(stream.mark_connected(generation));
    assert!(ui.is_live());

    assert!(stream.connection_closed(generation));
    assert!(!stream.connection_closed(generation));
    assert!(!stream.connection_closed(generation));
    assert_eq!(stream.state(), StreamState::Disconnected);
    assert!(!ui.is_live());

    tokio::time::sleep(Duration::from_millis(4900)).await;
    assert_eq!(stream.reconnect_attempts(), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(stream.reconnect_attempts(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(stream.reconnect_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timer_for_superseded_connection_is_noop() {
    let dir = TempDir::new().unwrap();
    let (stream, _cache, _ui) = listener(unreachable_base_url(), &dir);

    let old = stream.begin_attempt();
    assert!(stream.connection_closed(old));

    let newer = stream.begin_attempt();
    assert!(stream.mark_connected(newer));
    assert!(!stream.mark_connected(old));
    assert!(!stream.connection_closed(old));

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(stream.reconnect_attempts(), 0);
    assert_eq!(stream.state(), StreamState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_each_generation_gets_its_own_reconnect() {
    let dir = TempDir::new().unwrap();
    let (stream, _cache, _ui) = listener(unreachable_base_url(), &dir);

    let first = stream.begin_attempt();
    stream.connection_closed(first);
    tokio::time::sleep(Duration::from_millis(5100)).await;
    assert_eq!(stream.reconnect_attempts(), 1);

    let second = stream.begin_attempt();
    assert!(stream.connection_closed(second));
    tokio::time::sleep(Duration::from_millis(5100)).await;
    assert_eq!(stream.reconnect_attempts(), 2);
}

#[tokio::test]
async fn test_listener_applies_server_events() {
    let backend = BackendState::new();
    *backend.stream_body.lock().unwrap() = format!(
        ": keepalive\n\ndata: {}\n\ndata: {{broken\n\n",
        traffic_update_json()
    );
    let base = spawn_backend(backend.clone()).await;
    let dir = TempDir::new().unwrap();
    let (stream, cache, ui) = listener(format!("{base}/api/traffic-stream"), &dir);
    let mut events = ui.subscribe();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = stream.clone().spawn(shutdown_rx);

    tokio::time::timeout(Duration::from_secs(5), async {
        while cache.traffic().await.users.is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("traffic update not applied");

    // The body ends after the events, so the listener waits to reconnect.
    tokio::time::timeout(Duration::from_secs(5), async {
        let mut state = stream.subscribe_state();
        while *state.borrow_and_update() != StreamState::Disconnected {
            state.changed().await.unwrap();
        }
    })
    .await
    .expect("listener did not notice the closed stream");
    assert_eq!(backend.hits("stream"), 1);

    let mut saw_live = false;
    while let Ok(e) = events.try_recv() {
        saw_live |= e == UiEvent::LiveStatus(true);
    }
    assert!(saw_live);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("listener did not stop")
        .unwrap();
    assert!(!ui.is_live());
}

#[tokio::test]
async fn test_reconnect_now_opens_new_connection() {
    let backend = BackendState::new();
    let base = spawn_backend(backend.clone()).await;
    let dir = TempDir::new().unwrap();
    let (stream, _cache, _ui) = listener(format!("{base}/api/traffic-stream"), &dir);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = stream.clone().spawn(shutdown_rx);

    let wait_for_hits = |n: usize| {
        let backend = backend.clone();
        async move {
            tokio::time::timeout(Duration::from_secs(5), async {
                while backend.hits("stream") < n {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
            })
            .await
            .expect("stream not requested");
        }
    };
    wait_for_hits(1).await;
    let generation = stream.generation();

    stream.reconnect_now();
    wait_for_hits(2).await;
    assert!(stream.generation() > generation);

    shutdown_tx.send(true).unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_listener_reconnects_once_per_delay() {
    let backend = BackendState::new();
    let base = spawn_backend(backend.clone()).await;
    let dir = TempDir::new().unwrap();
    // Empty body: every connection ends right after it opens.
    let (stream, _cache, _ui) = listener_with_delay(
        format!("{base}/api/traffic-stream"),
        &dir,
        Duration::from_millis(400),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = stream.clone().spawn(shutdown_rx);

    let wait_for_hits = |n: usize| {
        let backend = backend.clone();
        async move {
            tokio::time::timeout(Duration::from_secs(5), async {
                while backend.hits("stream") < n {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            })
            .await
            .expect("stream not requested");
        }
    };

    wait_for_hits(1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.hits("stream"), 1, "reconnected before the delay");

    wait_for_hits(2).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.hits("stream"), 2, "more than one reconnect per delay");
    assert!(stream.reconnect_attempts() >= 1);

    shutdown_tx.send(true).unwrap();
    task.await.unwrap();
}
