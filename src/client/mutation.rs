//! One-shot mutation runner with observable progress state

use std::future::Future;

use tokio::sync::watch;
use tracing::warn;

use super::error::{ErrorInfo, Result};

/// Progress of a mutation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationState {
    pub loading: bool,
    pub error: Option<ErrorInfo>,
}

/// Runs mutations one at a time and records the outcome
///
/// Unlike [`super::watcher::Watcher`], a mutation keeps no data: the success
/// value is handed straight back to the caller and only `{loading, error}`
/// is published.
pub struct Mutation {
    state_tx: watch::Sender<MutationState>,
}

impl Mutation {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(MutationState::default());
        Self { state_tx }
    }

    /// Current state snapshot
    pub fn state(&self) -> MutationState {
        self.state_tx.borrow().clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<MutationState> {
        self.state_tx.subscribe()
    }

    /// Run `operation` with `payload` once
    ///
    /// Returns the success value, or `None` with `error` left set for the
    /// caller to inspect. A `Some` return guarantees `error` was cleared.
    pub async fn run<P, T, Fut>(&self, operation: impl FnOnce(P) -> Fut, payload: P) -> Option<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        self.state_tx.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        match operation(payload).await {
            Ok(value) => {
                self.state_tx.send_modify(|state| {
                    state.loading = false;
                    state.error = None;
                });
                Some(value)
            },
            Err(e) => {
                warn!(error = %e, "Mutation failed");
                self.state_tx.send_modify(|state| {
                    state.loading = false;
                    state.error = Some(ErrorInfo::from(&e));
                });
                None
            },
        }
    }
}

impl Default for Mutation {
    fn default() -> Self {
        Self::new()
    }
}
