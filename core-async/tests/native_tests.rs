//! Integration tests for the primitives the core crates rely on.

use core_async::{sync, task, time};
use std::sync::Arc;

#[core_async::test]
async fn spawned_task_returns_value() {
    let handle = task::spawn(async { 42 });
    assert_eq!(handle.await.unwrap(), 42);
}

#[core_async::test]
async fn spawn_blocking_runs_off_the_executor() {
    let handle = task::spawn_blocking(|| {
        std::thread::sleep(std::time::Duration::from_millis(5));
        100
    });
    assert_eq!(handle.await.unwrap(), 100);
}

#[core_async::test]
async fn timeout_elapses_for_slow_future() {
    let result = time::timeout(time::Duration::from_millis(10), async {
        time::sleep(time::Duration::from_millis(200)).await;
    })
    .await;

    assert!(result.is_err());
}

#[core_async::test]
async fn timeout_passes_fast_future_through() {
    let result = time::timeout(time::Duration::from_millis(200), async { "done" }).await;
    assert_eq!(result.unwrap(), "done");
}

#[core_async::test]
async fn mpsc_preserves_submission_order() {
    let (tx, mut rx) = sync::mpsc::channel(16);

    task::spawn(async move {
        for i in 0..5 {
            tx.send(i).await.unwrap();
        }
    });

    let mut received = Vec::new();
    while let Some(value) = rx.recv().await {
        received.push(value);
    }

    assert_eq!(received, vec![0, 1, 2, 3, 4]);
}

#[core_async::test]
async fn oneshot_delivers_reply() {
    let (tx, rx) = sync::oneshot::channel();

    task::spawn(async move {
        time::sleep(time::Duration::from_millis(5)).await;
        tx.send("ack").unwrap();
    });

    assert_eq!(rx.await.unwrap(), "ack");
}

#[core_async::test]
async fn watch_exposes_latest_value() {
    let (tx, mut rx) = sync::watch::channel(0u64);

    task::spawn(async move {
        for version in 1..=3 {
            tx.send(version).unwrap();
            time::sleep(time::Duration::from_millis(2)).await;
        }
    });

    let mut last = 0;
    while rx.changed().await.is_ok() {
        last = *rx.borrow();
        if last == 3 {
            break;
        }
    }

    assert_eq!(last, 3);
}

#[core_async::test]
async fn broadcast_fans_out_to_every_receiver() {
    let (tx, mut first) = sync::broadcast::channel(8);
    let mut second = tx.subscribe();

    tx.send(7u32).unwrap();

    assert_eq!(first.recv().await.unwrap(), 7);
    assert_eq!(second.recv().await.unwrap(), 7);
}

#[core_async::test]
async fn cancellation_token_stops_a_loop() {
    let token = sync::CancellationToken::new();
    let ticks = Arc::new(sync::Mutex::new(0u32));

    let loop_token = token.clone();
    let loop_ticks = Arc::clone(&ticks);
    let handle = task::spawn(async move {
        loop {
            *loop_ticks.lock().await += 1;
            tokio::select! {
                _ = loop_token.cancelled() => break,
                _ = time::sleep(time::Duration::from_millis(5)) => {}
            }
        }
    });

    time::sleep(time::Duration::from_millis(20)).await;
    token.cancel();
    handle.await.unwrap();

    let after_cancel = *ticks.lock().await;
    assert!(after_cancel >= 1);

    time::sleep(time::Duration::from_millis(20)).await;
    assert_eq!(*ticks.lock().await, after_cancel);
}

#[core_async::test]
async fn child_token_is_cancelled_with_parent() {
    let parent = sync::CancellationToken::new();
    let child = parent.child_token();

    parent.cancel();

    assert!(child.is_cancelled());
}

#[core_async::test]
async fn mutex_serializes_concurrent_increments() {
    let counter = Arc::new(sync::Mutex::new(0));
    let mut handles = Vec::new();

    for _ in 0..10 {
        let counter = Arc::clone(&counter);
        handles.push(task::spawn(async move {
            *counter.lock().await += 1;
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(*counter.lock().await, 10);
}

#[core_async::test]
async fn select_stops_on_cancellation() {
    let token = sync::CancellationToken::new();
    let child = token.clone();
    task::spawn(async move {
        time::sleep(time::Duration::from_millis(5)).await;
        child.cancel();
    });

    let cancelled = core_async::select! {
        _ = token.cancelled() => true,
        _ = time::sleep(time::Duration::from_secs(5)) => false,
    };

    assert!(cancelled);
}
