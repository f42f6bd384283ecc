//! End-to-end tests over the full pipeline:
//! gateway -> store -> change feed -> engine -> published view.

use std::time::Duration;

use taskfeed_core::{
    DataMode, FeedError, MutationGateway, RawRecord, SyncEngine, Task, TaskStore,
};

/// Let spawned feed tasks drain their queued snapshots
async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

fn pipeline() -> (TaskStore, SyncEngine, MutationGateway) {
    let store = TaskStore::open("artifacts/test/public/data/tasks");
    let engine = SyncEngine::new();
    engine.start(&store);
    let gateway = MutationGateway::new(store.clone());
    gateway.set_owner("u1");
    (store, engine, gateway)
}

fn record(text: &str, completed: bool, created_at: i64) -> RawRecord {
    let mut task = Task::new(text, "u1");
    task.completed = completed;
    task.created_at = created_at;
    RawRecord::from_task(&task)
}

// ============================================================================
// Feed Scenarios
// ============================================================================

/// Create a task; the feed emits it and the direct view contains exactly it
#[tokio::test]
async fn test_create_reaches_published_view() {
    let (_store, engine, gateway) = pipeline();
    let id = gateway.create_task("Buy milk").unwrap();
    settle().await;

    let view = engine.view();
    assert_eq!(view.mode, DataMode::Direct);
    assert_eq!(view.tasks.len(), 1);
    assert_eq!(view.tasks[0].id, id);
    assert_eq!(view.tasks[0].text, "Buy milk");
    assert_eq!(view.tasks[0].owner_id, "u1");
    assert!(!view.tasks[0].completed);
    engine.shutdown();
}

/// Toggle flows back through the feed with the id unchanged
#[tokio::test]
async fn test_toggle_reaches_published_view() {
    let (_store, engine, gateway) = pipeline();
    let id = gateway.create_task("Buy milk").unwrap();
    settle().await;

    gateway.toggle_task(&id, false).unwrap();
    settle().await;

    let view = engine.view();
    assert_eq!(view.tasks.len(), 1);
    assert_eq!(view.tasks[0].id, id);
    assert!(view.tasks[0].completed);
    engine.shutdown();
}

/// Empty or whitespace text is rejected before any write; the feed never
/// emits a corresponding record
#[tokio::test]
async fn test_empty_text_never_reaches_store() {
    let (store, engine, gateway) = pipeline();

    for text in ["", "   ", " \t "] {
        let err = gateway.create_task(text).unwrap_err();
        assert!(matches!(err, FeedError::Validation(_)));
    }
    settle().await;

    assert!(store.snapshot().is_empty());
    assert!(engine.view().tasks.is_empty());
    engine.shutdown();
}

/// Delete then toggle the same id: not found, and the id never reappears
#[tokio::test]
async fn test_delete_then_toggle_not_found() {
    let (_store, engine, gateway) = pipeline();
    let id = gateway.create_task("Buy milk").unwrap();
    settle().await;

    gateway.delete_task(&id).unwrap();
    settle().await;

    let err = gateway.toggle_task(&id, false).unwrap_err();
    assert!(matches!(err, FeedError::NotFound(_)));

    settle().await;
    assert!(engine.view().tasks.iter().all(|t| t.id != id));
    engine.shutdown();
}

/// Two writers (e.g. two tabs) issue mutations concurrently against the
/// same store; the store serializes them and the view holds both in sort
/// order
#[tokio::test]
async fn test_two_writers_merge_in_view() {
    let (store, engine, gateway_a) = pipeline();
    let gateway_b = MutationGateway::new(store.clone());
    gateway_b.set_owner("u2");

    let writes = vec![
        tokio::spawn(async move { gateway_a.create_task("from a") }),
        tokio::spawn(async move { gateway_b.create_task("from b") }),
    ];
    for result in futures::future::join_all(writes).await {
        result.unwrap().unwrap();
    }
    settle().await;

    let view = engine.view();
    assert_eq!(view.tasks.len(), 2);
    let owners: Vec<_> = view.tasks.iter().map(|t| t.owner_id.as_str()).collect();
    assert!(owners.contains(&"u1"));
    assert!(owners.contains(&"u2"));
    assert!(view
        .tasks
        .windows(2)
        .all(|w| w[0].view_order(&w[1]).is_le()));
    engine.shutdown();
}

/// The watch channel notifies a waiting consumer of a new view
#[tokio::test]
async fn test_view_subscriber_notified() {
    let (_store, engine, gateway) = pipeline();
    let mut view_rx = engine.subscribe_view();

    gateway.create_task("Buy milk").unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            view_rx.changed().await.unwrap();
            if !view_rx.borrow().tasks.is_empty() {
                break;
            }
        }
    })
    .await
    .expect("view never updated");

    assert_eq!(view_rx.borrow().tasks[0].text, "Buy milk");
    engine.shutdown();
}

// ============================================================================
// Mode Switching
// ============================================================================

/// Switching to API mode re-renders the last snapshot through the shim;
/// after the delay the round-tripped record is unchanged
#[tokio::test(start_paused = true)]
async fn test_api_mode_round_trip_preserves_record() {
    let (_store, engine, gateway) = pipeline();
    let id = gateway.create_task("X").unwrap();
    settle().await;
    gateway.toggle_task(&id, false).unwrap();
    settle().await;

    engine.set_mode(DataMode::Api);
    tokio::time::sleep(Duration::from_millis(600)).await;

    let view = engine.view();
    assert_eq!(view.mode, DataMode::Api);
    assert_eq!(view.tasks.len(), 1);
    assert_eq!(view.tasks[0].id, id);
    assert_eq!(view.tasks[0].text, "X");
    assert!(view.tasks[0].completed);
    engine.shutdown();
}

/// For an unchanged snapshot, the API path publishes a view observably
/// equivalent to the direct path
#[tokio::test(start_paused = true)]
async fn test_api_path_equivalent_to_direct_path() {
    let engine = SyncEngine::new();
    let snapshot = vec![
        record("a", false, 100),
        record("b", true, 50),
        record("c", true, 200),
    ];

    engine.on_snapshot(snapshot);
    let direct = engine.view().tasks.clone();

    engine.set_mode(DataMode::Api);
    tokio::time::sleep(Duration::from_millis(600)).await;

    let api = engine.view();
    assert_eq!(api.mode, DataMode::Api);
    assert_eq!(api.tasks, direct);
    engine.shutdown();
}

// ============================================================================
// Stale Result Suppression
// ============================================================================

/// S1 under API mode leaves a fetch pending; the mode switches to direct
/// and S2 arrives; when the pending fetch resolves it must not overwrite
/// the direct view derived from S2
#[tokio::test(start_paused = true)]
async fn test_pending_api_fetch_cannot_overwrite_newer_direct_view() {
    let engine = SyncEngine::new();

    engine.set_mode(DataMode::Api);
    engine.on_snapshot(vec![record("s1", false, 100)]);

    // Before the fetch resolves: back to direct, then a newer snapshot
    engine.set_mode(DataMode::Direct);
    engine.on_snapshot(vec![record("s2", false, 200)]);

    let view = engine.view();
    assert_eq!(view.mode, DataMode::Direct);
    assert_eq!(view.tasks[0].text, "s2");

    // Let the stale fetch complete
    tokio::time::sleep(Duration::from_secs(1)).await;

    let view = engine.view();
    assert_eq!(view.mode, DataMode::Direct);
    assert_eq!(view.tasks.len(), 1);
    assert_eq!(view.tasks[0].text, "s2");
    engine.shutdown();
}

/// Two snapshots in API mode race through the shim; only the result
/// derived from the newest snapshot is published
#[tokio::test(start_paused = true)]
async fn test_last_snapshot_wins_within_api_mode() {
    let engine = SyncEngine::new();
    engine.set_mode(DataMode::Api);

    engine.on_snapshot(vec![record("s1", false, 100)]);
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine.on_snapshot(vec![record("s2", false, 200)]);

    // s1's fetch has resolved by now, but its epoch is stale
    tokio::time::sleep(Duration::from_millis(450)).await;
    assert!(
        engine.view().tasks.is_empty(),
        "stale fetch must not publish"
    );

    // s2's fetch resolves and publishes
    tokio::time::sleep(Duration::from_millis(100)).await;
    let view = engine.view();
    assert_eq!(view.mode, DataMode::Api);
    assert_eq!(view.tasks.len(), 1);
    assert_eq!(view.tasks[0].text, "s2");
    engine.shutdown();
}

// ============================================================================
// Teardown
// ============================================================================

/// Shutting down twice has the same observable effect as once
#[tokio::test]
async fn test_shutdown_idempotent() {
    let (store, engine, gateway) = pipeline();
    gateway.create_task("Buy milk").unwrap();
    settle().await;

    engine.shutdown();
    engine.shutdown();

    // Mutations still reach the store, but the torn-down view stays frozen
    gateway.create_task("after shutdown").unwrap();
    settle().await;
    assert_eq!(store.snapshot().len(), 2);
    assert_eq!(engine.view().tasks.len(), 1);
}

/// A pending API render from a torn-down engine never publishes
#[tokio::test(start_paused = true)]
async fn test_shutdown_suppresses_inflight_render() {
    let (_store, engine, gateway) = pipeline();
    engine.set_mode(DataMode::Api);
    gateway.create_task("Buy milk").unwrap();
    settle().await;

    engine.shutdown();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(engine.view().tasks.is_empty());
}
