//! Background watchers binding backend resources to observable fetch state

use std::future::Future;

use tokio::{
    select,
    sync::{broadcast, mpsc, oneshot, watch},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, warn};

use super::{
    config::WatchOptions,
    error::{ErrorInfo, Result},
};

/// Snapshot of one watched resource
///
/// `data` keeps the last successful value across refreshes and failures, so
/// consumers can keep showing stale content while a refresh is in flight or
/// after it failed.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<ErrorInfo>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

impl<T> FetchState<T> {
    /// True before the first invocation has started
    pub fn is_idle(&self) -> bool {
        !self.loading && self.data.is_none() && self.error.is_none()
    }

    /// True once an invocation has settled, successfully or not
    pub fn is_settled(&self) -> bool {
        !self.loading && (self.data.is_some() || self.error.is_some())
    }
}

/// A zero-argument asynchronous operation yielding one fetch outcome
///
/// Blanket-implemented for closures returning a future, so an API call can
/// be bound with a plain `move ||` closure without naming a type. The watch
/// task invokes the producer through a shared reference, hence `Sync`.
pub trait Producer: Send + Sync + 'static {
    /// Value produced on success
    type Output: Clone + Send + Sync + 'static;

    /// Run one fetch to completion
    fn produce(&self) -> impl Future<Output = Result<Self::Output>> + Send;
}

impl<F, Fut, T> Producer for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send,
    T: Clone + Send + Sync + 'static,
{
    type Output = T;

    fn produce(&self) -> impl Future<Output = Result<T>> + Send {
        self()
    }
}

enum WatchCommand<T> {
    Refetch {
        done: oneshot::Sender<FetchState<T>>,
    },
}

/// Handle to a background watch task
///
/// The task owns the producer and publishes [`FetchState`] snapshots over a
/// watch channel. Invocations are serialized by the task's loop: a refetch
/// arriving while a fetch is in flight runs right after it settles, so a
/// slow stale response can never overwrite a newer one. Dropping the handle
/// or calling [`Watcher::shutdown`] stops all future invocations; an
/// in-flight fetch settles on its own and then the task exits.
pub struct Watcher<T> {
    state_rx: watch::Receiver<FetchState<T>>,
    command_tx: mpsc::UnboundedSender<WatchCommand<T>>,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl<T> Watcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Spawn a watch task around `producer`
    ///
    /// With `immediate` set the first fetch runs right away; a nonzero
    /// `refresh_interval` then re-runs it on that cadence, first tick one
    /// period after spawn.
    pub fn spawn<P>(producer: P, options: WatchOptions) -> Self
    where
        P: Producer<Output = T>,
    {
        let (state_tx, state_rx) = watch::channel(FetchState::default());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let task = tokio::spawn(run_watch(producer, options, state_tx, command_rx, shutdown_rx));

        Self {
            state_rx,
            command_tx,
            shutdown_tx,
            task,
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> FetchState<T> {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.state_rx.clone()
    }

    /// Trigger a fetch now and wait for it to settle
    ///
    /// Returns the snapshot published by that invocation. When the watch
    /// task is already gone the current state is returned unchanged.
    pub async fn refetch(&self) -> FetchState<T> {
        let (done_tx, done_rx) = oneshot::channel();
        if self
            .command_tx
            .send(WatchCommand::Refetch { done: done_tx })
            .is_err()
        {
            return self.state();
        }

        match done_rx.await {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }

    /// Stop the watch task and wait for it to wind down
    pub async fn shutdown(self) {
        debug!("Sending shutdown signal to watcher");
        let _ = self.shutdown_tx.send(());
        let _ = self.task.await;
    }
}

/// Watch task main loop
async fn run_watch<P>(
    producer: P,
    options: WatchOptions,
    state_tx: watch::Sender<FetchState<P::Output>>,
    mut command_rx: mpsc::UnboundedReceiver<WatchCommand<P::Output>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    P: Producer,
{
    debug!(
        immediate = options.immediate,
        refresh_interval = ?options.refresh_interval,
        "Starting watch task"
    );

    if options.immediate {
        run_once(&producer, &state_tx).await;
    }

    let mut ticker = options.effective_interval().map(|period| {
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    loop {
        select! {
            command = command_rx.recv() => match command {
                Some(WatchCommand::Refetch { done }) => {
                    let state = run_once(&producer, &state_tx).await;
                    let _ = done.send(state);
                },
                None => break,
            },
            _ = next_tick(&mut ticker) => {
                run_once(&producer, &state_tx).await;
            },
            _ = shutdown_rx.recv() => break,
        }
    }

    debug!("Watch task ended");
}

/// Wait for the next scheduled poll, or forever when polling is disabled
async fn next_tick(ticker: &mut Option<time::Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        },
        None => std::future::pending().await,
    }
}

/// One invocation: publish the loading transition, run the producer, publish
/// the settled outcome
///
/// Previous `data` survives both the loading phase and a failure.
async fn run_once<P>(
    producer: &P,
    state_tx: &watch::Sender<FetchState<P::Output>>,
) -> FetchState<P::Output>
where
    P: Producer,
{
    state_tx.send_modify(|state| {
        state.loading = true;
        state.error = None;
    });

    match producer.produce().await {
        Ok(value) => {
            state_tx.send_modify(|state| {
                state.loading = false;
                state.data = Some(value);
                state.error = None;
            });
        },
        Err(e) => {
            warn!(error = %e, "Watched fetch failed");
            state_tx.send_modify(|state| {
                state.loading = false;
                state.error = Some(ErrorInfo::from(&e));
            });
        },
    }

    state_tx.borrow().clone()
}
