use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use mmlink_client::client::{
    config::WatchOptions,
    error::{ClientError, ErrorKind},
    mutation::Mutation,
    watcher::{FetchState, Watcher},
};
use tokio::{sync::Notify, time};

#[derive(Debug, Clone, PartialEq)]
struct Totals {
    total: u32,
}

/// Wait until the watcher has finished an invocation, then return that state.
async fn settled<T: Clone + Send + Sync + 'static>(watcher: &Watcher<T>) -> FetchState<T> {
    let mut states = watcher.subscribe();
    loop {
        {
            let state = states.borrow_and_update();
            if state.is_settled() {
                return state.clone();
            }
        }
        if states.changed().await.is_err() {
            return watcher.state();
        }
    }
}

#[tokio::test]
async fn immediate_watch_publishes_the_produced_value() {
    let watcher = Watcher::spawn(
        || async { Ok::<_, ClientError>(Totals { total: 42 }) },
        WatchOptions::default(),
    );

    let state = settled(&watcher).await;
    assert_eq!(state.data, Some(Totals { total: 42 }));
    assert!(!state.loading);
    assert_eq!(state.error, None);

    watcher.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watch_task_runs_on_a_multi_thread_runtime() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let watcher = Watcher::spawn(
        move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, ClientError>(n) }
        },
        WatchOptions::default(),
    );

    let state = settled(&watcher).await;
    assert_eq!(state.data, Some(0));

    let refetched = watcher.refetch().await;
    assert_eq!(refetched.data, Some(1));

    watcher.shutdown().await;
}

#[tokio::test]
async fn starts_idle_without_immediate() {
    let watcher = Watcher::spawn(
        || async { Ok::<_, ClientError>(0_u32) },
        WatchOptions::manual(),
    );

    let state = watcher.state();
    assert!(state.is_idle());
    assert_eq!(state.data, None);
    assert_eq!(state.error, None);
    assert!(!state.loading);

    watcher.shutdown().await;
}

#[tokio::test]
async fn failure_keeps_stale_data_and_sets_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let watcher = Watcher::spawn(
        move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Ok(7_u32)
                } else {
                    Err(ClientError::Timeout)
                }
            }
        },
        WatchOptions::manual(),
    );

    let first = watcher.refetch().await;
    assert_eq!(first.data, Some(7));
    assert_eq!(first.error, None);

    let second = watcher.refetch().await;
    assert_eq!(second.data, Some(7), "stale data should survive a failure");
    assert!(!second.loading);
    let error = second.error.expect("error should be recorded");
    assert_eq!(error.kind, ErrorKind::Timeout);
    assert_eq!(error.message, "Request timeout - please check your connection");

    watcher.shutdown().await;
}

#[tokio::test]
async fn success_after_failure_clears_the_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let watcher = Watcher::spawn(
        move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ClientError::http(500, "boom"))
                } else {
                    Ok(5_u32)
                }
            }
        },
        WatchOptions::manual(),
    );

    let failed = watcher.refetch().await;
    assert_eq!(failed.data, None);
    assert!(failed.error.is_some());

    let recovered = watcher.refetch().await;
    assert_eq!(recovered.data, Some(5));
    assert_eq!(recovered.error, None);

    watcher.shutdown().await;
}

#[tokio::test]
async fn loading_is_visible_while_in_flight() {
    let gate = Arc::new(Notify::new());
    let producer_gate = Arc::clone(&gate);
    let watcher = Watcher::spawn(
        move || {
            let gate = Arc::clone(&producer_gate);
            async move {
                gate.notified().await;
                Ok::<_, ClientError>(1_u32)
            }
        },
        WatchOptions::manual(),
    );

    let mut states = watcher.subscribe();
    let (final_state, saw_loading) = tokio::join!(watcher.refetch(), async {
        loop {
            {
                let state = states.borrow_and_update();
                if state.loading {
                    break;
                }
            }
            if states.changed().await.is_err() {
                return false;
            }
        }
        gate.notify_one();
        true
    });

    assert!(saw_loading);
    assert_eq!(final_state.data, Some(1));
    assert!(!final_state.loading);

    watcher.shutdown().await;
}

#[tokio::test]
async fn each_refetch_settles_independently() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let watcher = Watcher::spawn(
        move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, ClientError>(n) }
        },
        WatchOptions::manual(),
    );

    for expected in 0..3 {
        let state = watcher.refetch().await;
        assert_eq!(state.data, Some(expected));
        assert!(!state.loading);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    watcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn interval_polling_keeps_invoking_the_producer() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let watcher = Watcher::spawn(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ClientError>(()) }
        },
        WatchOptions::default()
            .with_immediate(false)
            .with_refresh_interval(Some(Duration::from_secs(5))),
    );

    time::sleep(Duration::from_secs(26)).await;
    assert!(calls.load(Ordering::SeqCst) >= 5);

    watcher.shutdown().await;
    let after_shutdown = calls.load(Ordering::SeqCst);
    time::sleep(Duration::from_secs(60)).await;
    assert_eq!(
        calls.load(Ordering::SeqCst),
        after_shutdown,
        "no fetches may run after shutdown"
    );
}

#[tokio::test(start_paused = true)]
async fn first_poll_waits_one_full_interval() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let watcher = Watcher::spawn(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ClientError>(()) }
        },
        WatchOptions::poll(Duration::from_secs(30)).with_immediate(false),
    );

    time::sleep(Duration::from_secs(29)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    time::sleep(Duration::from_secs(2)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    watcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn dropping_the_watcher_stops_polling() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let watcher = Watcher::spawn(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ClientError>(()) }
        },
        WatchOptions::poll(Duration::from_secs(1)).with_immediate(false),
    );

    drop(watcher);
    time::sleep(Duration::from_secs(30)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn mutation_returns_value_and_clears_error() {
    let mutation = Mutation::new();

    let value = mutation
        .run(|x: u32| async move { Ok::<_, ClientError>(x * 2) }, 21)
        .await;

    assert_eq!(value, Some(42));
    let state = mutation.state();
    assert!(!state.loading);
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn failed_mutation_returns_none_and_keeps_error() {
    let mutation = Mutation::new();

    let value = mutation
        .run(
            |_: u32| async move { Err::<u32, _>(ClientError::http(500, "boom")) },
            1,
        )
        .await;

    assert_eq!(value, None);
    let state = mutation.state();
    assert!(!state.loading);
    let error = state.error.expect("error should be recorded");
    assert_eq!(error.kind, ErrorKind::HttpStatus(500));
    assert_eq!(error.message, "boom");
}
