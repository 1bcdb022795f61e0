//! Integration tests for the Coordinator.
//!
//! These tests drive the coordinator through `spawn_coordinator()` and the
//! `CoordinatorHandle`, with in-memory outbound queues and a fake socket
//! closer instead of real sockets.
//!
//! Tests CAN use `.unwrap()` and `.expect()`.

use std::sync::Arc;
use std::time::Duration;

use chatter_core::{ClientIdentity, CompleteMessage};
use chatterd::config::ServerConfig;
use chatterd::coordinator::{
    spawn_coordinator, ClientId, CoordinatorError, CoordinatorHandle, ReadOutcome, Registration,
    SocketCloser,
};
use tokio::sync::mpsc;
use tokio::time::timeout;

// ============================================================================
// Test Helpers
// ============================================================================

/// Closer that reports each close on a channel.
struct NotifyingCloser(mpsc::UnboundedSender<()>);

impl SocketCloser for NotifyingCloser {
    fn close(&self) {
        let _ = self.0.send(());
    }
}

struct TestClient {
    id: ClientId,
    inbox: mpsc::Receiver<Arc<CompleteMessage>>,
    closed: mpsc::UnboundedReceiver<()>,
}

impl TestClient {
    async fn register(handle: &CoordinatorHandle, name: &str, queue: usize) -> Self {
        let (tx, inbox) = mpsc::channel(queue);
        let (close_tx, closed) = mpsc::unbounded_channel();
        let id = handle
            .register(Registration {
                identity: ClientIdentity::new(name),
                outbound: tx,
                closer: Box::new(NotifyingCloser(close_tx)),
            })
            .await
            .expect("register");
        Self { id, inbox, closed }
    }

    /// Receives the next body, failing the test after a short wait.
    async fn next_body(&mut self) -> String {
        timeout(Duration::from_secs(1), self.inbox.recv())
            .await
            .expect("message in time")
            .expect("queue open")
            .body
            .clone()
    }

    fn drain(&mut self) -> Vec<String> {
        let mut bodies = Vec::new();
        while let Ok(msg) = self.inbox.try_recv() {
            bodies.push(msg.body.clone());
        }
        bodies
    }
}

fn message(body: &str) -> CompleteMessage {
    CompleteMessage::new(body, ClientIdentity::new("author"), chrono::Local::now())
}

// ============================================================================
// History & Registration
// ============================================================================

#[tokio::test]
async fn test_history_capped_after_overflow() {
    let config = ServerConfig::default();
    let handle = spawn_coordinator(&config).unwrap();

    for i in 0..=config.history_capacity {
        handle.broadcast(message(&format!("m{i}"))).await.unwrap();
    }

    let history = handle.history().await;
    assert_eq!(history.len(), config.history_capacity);
    assert!(history.iter().all(|m| m.body != "m0"));
    assert_eq!(
        history.last().unwrap().body,
        format!("m{}", config.history_capacity)
    );
}

#[tokio::test]
async fn test_late_client_gets_capped_replay_before_live() {
    let config = ServerConfig::default();
    let handle = spawn_coordinator(&config).unwrap();

    for i in 0..12 {
        handle.broadcast(message(&format!("m{i}"))).await.unwrap();
    }

    // Queue sized to hold the replay plus the join and one live message
    let mut late = TestClient::register(&handle, "late", 16).await;
    handle.broadcast(message("live")).await.unwrap();

    let mut received = Vec::new();
    for _ in 0..12 {
        received.push(late.next_body().await);
    }

    let expected_replay: Vec<String> = (2..12).map(|i| format!("m{i}")).collect();
    assert_eq!(&received[..10], expected_replay.as_slice());
    assert_eq!(received[10], "Client late has joined");
    assert_eq!(received[11], "live");
}

#[tokio::test]
async fn test_full_history_replay_leaves_room_for_join_with_default_queue() {
    let config = ServerConfig::default();
    let handle = spawn_coordinator(&config).unwrap();

    for i in 0..config.history_capacity {
        handle.broadcast(message(&format!("m{i}"))).await.unwrap();
    }

    let mut carol = TestClient::register(&handle, "carol", config.outbound_queue).await;

    let mut expected: Vec<String> = (0..config.history_capacity)
        .map(|i| format!("m{i}"))
        .collect();
    expected.push("Client carol has joined".to_string());
    assert_eq!(carol.drain(), expected);
}

#[tokio::test]
async fn test_undersized_queue_keeps_newest_replay_and_own_join() {
    let handle = spawn_coordinator(&ServerConfig::default()).unwrap();

    for i in 0..10 {
        handle.broadcast(message(&format!("m{i}"))).await.unwrap();
    }

    let mut dave = TestClient::register(&handle, "dave", 10).await;

    let mut expected: Vec<String> = (1..10).map(|i| format!("m{i}")).collect();
    expected.push("Client dave has joined".to_string());
    assert_eq!(dave.drain(), expected);
}

#[tokio::test]
async fn test_fewer_broadcasts_than_capacity_replayed_in_full() {
    let handle = spawn_coordinator(&ServerConfig::default()).unwrap();

    handle.broadcast(message("first")).await.unwrap();
    handle.broadcast(message("second")).await.unwrap();

    let mut client = TestClient::register(&handle, "c", 10).await;
    assert_eq!(client.next_body().await, "first");
    assert_eq!(client.next_body().await, "second");
    assert_eq!(client.next_body().await, "Client c has joined");
}

#[tokio::test]
async fn test_ids_unique_across_reconnects() {
    let handle = spawn_coordinator(&ServerConfig::default()).unwrap();

    let a = TestClient::register(&handle, "a", 10).await;
    handle.unregister(a.id, ReadOutcome::Eof).await.unwrap();
    let b = TestClient::register(&handle, "a", 10).await;

    assert_ne!(a.id, b.id);
    assert_eq!(handle.client_count().await, 1);
}

// ============================================================================
// Unregistration
// ============================================================================

#[tokio::test]
async fn test_concurrent_unregister_removes_once() {
    let handle = spawn_coordinator(&ServerConfig::default()).unwrap();

    let leaver = TestClient::register(&handle, "leaver", 10).await;
    let mut watcher = TestClient::register(&handle, "watcher", 10).await;
    assert_eq!(
        watcher.drain(),
        vec!["Client leaver has joined", "Client watcher has joined"]
    );

    let (first, second) = tokio::join!(
        handle.unregister(leaver.id, ReadOutcome::Eof),
        handle.unregister(leaver.id, ReadOutcome::Failed("use of closed socket".into())),
    );

    let oks = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(oks, 1, "exactly one unregister succeeds");
    assert!(
        [first, second]
            .iter()
            .any(|r| *r == Err(CoordinatorError::ClientNotFound(leaver.id))),
        "the other reports ClientNotFound"
    );

    assert_eq!(handle.client_count().await, 1);
    let announcements = watcher.drain();
    assert_eq!(announcements.len(), 1);
    assert!(announcements[0].starts_with("Client leaver has "));
}

#[tokio::test]
async fn test_disconnect_reasons_in_announcements() {
    let handle = spawn_coordinator(&ServerConfig::default()).unwrap();
    let mut watcher = TestClient::register(&handle, "watcher", 10).await;
    watcher.next_body().await;

    let reset = TestClient::register(&handle, "reset", 10).await;
    let broken = TestClient::register(&handle, "broken", 10).await;
    watcher.next_body().await;
    watcher.next_body().await;

    handle.unregister(reset.id, ReadOutcome::Reset).await.unwrap();
    handle
        .unregister(broken.id, ReadOutcome::Failed("broken pipe".into()))
        .await
        .unwrap();

    assert_eq!(watcher.next_body().await, "Client reset has left");
    assert_eq!(watcher.next_body().await, "Client broken has broken pipe");
}

// ============================================================================
// Backpressure
// ============================================================================

#[tokio::test]
async fn test_full_queue_does_not_block_or_starve_others() {
    let handle = spawn_coordinator(&ServerConfig::default()).unwrap();

    // Never drained after registration
    let _stalled = TestClient::register(&handle, "stalled", 1).await;
    let mut healthy = TestClient::register(&handle, "healthy", 64).await;
    healthy.drain();

    let sends = async {
        for i in 0..20 {
            handle.broadcast(message(&format!("b{i}"))).await.unwrap();
        }
    };
    timeout(Duration::from_secs(1), sends)
        .await
        .expect("broadcaster never blocks on a stalled client");

    for i in 0..20 {
        assert_eq!(healthy.next_body().await, format!("b{i}"));
    }
}

// ============================================================================
// Idle Eviction (synthetic clock)
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_idle_client_closed_and_announced_timed_out() {
    let config = ServerConfig::default();
    let handle = spawn_coordinator(&config).unwrap();

    let mut idle = TestClient::register(&handle, "idle", 10).await;
    let mut watcher = TestClient::register(&handle, "watcher", 10).await;
    watcher.drain();

    // Nothing happens before the threshold
    tokio::time::advance(Duration::from_secs(30)).await;
    tokio::task::yield_now().await;
    assert!(idle.closed.try_recv().is_err());

    // The paused clock auto-advances through reaper ticks while we wait
    timeout(Duration::from_secs(120), idle.closed.recv())
        .await
        .expect("idle client closed by reaper")
        .expect("closer notified");

    // Still registered until its actor unregisters
    assert_eq!(handle.client_count().await, 2);

    handle.unregister(idle.id, ReadOutcome::Eof).await.unwrap();

    let bodies = watcher.drain();
    assert_eq!(bodies, vec!["Client idle has timed out".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_touch_keeps_client_alive() {
    let handle = spawn_coordinator(&ServerConfig::default()).unwrap();
    let mut chatty = TestClient::register(&handle, "chatty", 10).await;

    for _ in 0..10 {
        tokio::time::advance(Duration::from_secs(30)).await;
        handle.touch(chatty.id).await;
    }
    tokio::task::yield_now().await;

    assert!(chatty.closed.try_recv().is_err());
    assert_eq!(handle.reap_idle(Duration::from_secs(60)).await.unwrap(), 0);
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_shutdown_stops_processing() {
    let handle = spawn_coordinator(&ServerConfig::default()).unwrap();
    handle.shutdown().await;

    timeout(Duration::from_secs(1), handle.shutdown_token().cancelled())
        .await
        .expect("shutdown token cancelled");

    let result = handle.broadcast(message("late")).await;
    assert_eq!(result, Err(CoordinatorError::ChannelClosed));
}
