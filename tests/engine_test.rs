//! Integration tests for the deduplication coordinator.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use idemgate::engine::{Coordinator, Outcome};
use idemgate::error::Error;
use idemgate::model::OperationResult;
use idemgate::store::{EntryStore, MemoryStore};

const PAYLOAD: &[u8] = br#"{"amount": 100, "currency": "GHS"}"#;
const OTHER_PAYLOAD: &[u8] = br#"{"amount": 500, "currency": "GHS"}"#;

fn engine() -> (Coordinator, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new(Duration::from_secs(24 * 60 * 60)));
    (Coordinator::new(store.clone()), store)
}

/// Downstream stand-in that counts invocations and stamps each result with
/// its call number, so a replayed result is distinguishable from a rerun.
fn counting_op(calls: Arc<AtomicUsize>) -> impl FnOnce() -> std::future::Ready<OperationResult> {
    move || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        std::future::ready(OperationResult::new(201, format!("charge #{n}")))
    }
}

/// Counting stand-in that also takes a while, for in-flight scenarios.
fn slow_op(
    calls: Arc<AtomicUsize>,
    delay: Duration,
) -> impl FnOnce() -> std::pin::Pin<Box<dyn Future<Output = OperationResult> + Send>> {
    move || {
        Box::pin(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            OperationResult::new(201, "charge #1")
        })
    }
}

// ---------------------------------------------------------------------------
// Sequential retries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_call_executes_and_caches() {
    let (coordinator, store) = engine();
    let calls = Arc::new(AtomicUsize::new(0));

    let outcome = coordinator
        .handle("k1", PAYLOAD, counting_op(calls.clone()))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Executed(OperationResult::new(201, "charge #1"))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(store.get("k1").unwrap().state.is_terminal());
}

#[tokio::test]
async fn retry_with_identical_payload_replays_original_bytes() {
    let (coordinator, _store) = engine();
    let calls = Arc::new(AtomicUsize::new(0));

    let first = coordinator
        .handle("k1", PAYLOAD, counting_op(calls.clone()))
        .await
        .unwrap();

    // Retry: the op would produce "charge #2" if it ran, but it must not.
    let second = coordinator
        .handle("k1", PAYLOAD, counting_op(calls.clone()))
        .await
        .unwrap();

    assert!(second.is_replay());
    assert_eq!(second.result(), first.result());
    assert_eq!(second.result().body, b"charge #1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn conflicting_payload_rejected_and_original_result_stands() {
    let (coordinator, store) = engine();
    let calls = Arc::new(AtomicUsize::new(0));

    coordinator
        .handle("k1", PAYLOAD, counting_op(calls.clone()))
        .await
        .unwrap();
    let cached = store.get("k1").unwrap();

    let conflict = coordinator
        .handle("k1", OTHER_PAYLOAD, counting_op(calls.clone()))
        .await;
    assert!(matches!(conflict, Err(Error::Conflict { key }) if key == "k1"));

    // First writer's entry is untouched and still replayable.
    assert_eq!(store.get("k1").unwrap(), cached);
    let replay = coordinator
        .handle("k1", PAYLOAD, counting_op(calls.clone()))
        .await
        .unwrap();
    assert_eq!(replay.result().body, b"charge #1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_key_rejected_before_any_store_access() {
    let (coordinator, store) = engine();
    let calls = Arc::new(AtomicUsize::new(0));

    let outcome = coordinator
        .handle("", PAYLOAD, counting_op(calls.clone()))
        .await;

    assert!(matches!(outcome, Err(Error::InvalidKey)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn downstream_failure_is_cached_not_retried() {
    let (coordinator, _store) = engine();
    let calls = Arc::new(AtomicUsize::new(0));

    let failing_op = {
        let calls = calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(OperationResult::new(502, "processor unavailable"))
        }
    };
    let first = coordinator.handle("k1", PAYLOAD, failing_op).await.unwrap();
    assert_eq!(first.result().code, 502);

    // A retry replays the failure; picking a fresh key is the caller's job.
    let second = coordinator
        .handle("k1", PAYLOAD, counting_op(calls.clone()))
        .await
        .unwrap();
    assert!(second.is_replay());
    assert_eq!(second.result().code, 502);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Concurrent duplicates
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn concurrent_duplicates_execute_exactly_once() {
    let (coordinator, _store) = engine();
    let calls = Arc::new(AtomicUsize::new(0));

    let submit = || {
        let coordinator = coordinator.clone();
        let op = slow_op(calls.clone(), Duration::from_millis(150));
        tokio::spawn(async move { coordinator.handle("k2", PAYLOAD, op).await })
    };
    let (a, b) = (submit(), submit());
    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a.result(), b.result());
    // Exactly one fresh execution, the other a replay.
    assert_eq!(a.is_replay() as u8 + b.is_replay() as u8, 1);
}

#[tokio::test(start_paused = true)]
async fn all_waiters_unblock_when_the_original_settles() {
    let (coordinator, _store) = engine();
    let calls = Arc::new(AtomicUsize::new(0));

    let original = {
        let coordinator = coordinator.clone();
        let op = slow_op(calls.clone(), Duration::from_millis(100));
        tokio::spawn(async move { coordinator.handle("k2", PAYLOAD, op).await })
    };
    // Let the original claim the key before the duplicates arrive.
    tokio::task::yield_now().await;

    let mut duplicates = Vec::new();
    for _ in 0..5 {
        let coordinator = coordinator.clone();
        let op = counting_op(calls.clone());
        duplicates.push(tokio::spawn(async move {
            coordinator.handle("k2", PAYLOAD, op).await
        }));
    }

    let original = original.await.unwrap().unwrap();
    assert!(!original.is_replay());

    for duplicate in duplicates {
        let outcome = duplicate.await.unwrap().unwrap();
        assert!(outcome.is_replay());
        assert_eq!(outcome.result(), original.result());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn conflicting_duplicate_rejected_while_original_in_flight() {
    let (coordinator, _store) = engine();
    let calls = Arc::new(AtomicUsize::new(0));

    let original = {
        let coordinator = coordinator.clone();
        let op = slow_op(calls.clone(), Duration::from_millis(150));
        tokio::spawn(async move { coordinator.handle("k2", PAYLOAD, op).await })
    };
    tokio::task::yield_now().await;

    // Different payload, same key: rejected without waiting out the original
    // and without a second execution.
    let conflict = coordinator
        .handle("k2", OTHER_PAYLOAD, counting_op(calls.clone()))
        .await;
    assert!(matches!(conflict, Err(Error::Conflict { .. })));

    original.await.unwrap().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
