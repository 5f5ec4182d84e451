//! Single-flight gate for token refresh
//!
//! The first caller becomes the leader and runs the refresh; callers arriving
//! while it is in flight wait on a `watch` channel and receive the leader's
//! outcome. The slot is emptied when the leader finishes, so the next expiry
//! starts a fresh refresh.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::debug;

use crate::error::RefreshFailure;
use crate::models::TokenPair;

pub(crate) type RefreshOutcome = std::result::Result<TokenPair, RefreshFailure>;

struct InFlightRefresh {
    tx: watch::Sender<Option<RefreshOutcome>>,
    rx: watch::Receiver<Option<RefreshOutcome>>,
}

#[derive(Default)]
pub(crate) struct RefreshGate {
    // Never held across an await point.
    inflight: Mutex<Option<Arc<InFlightRefresh>>>,
}

impl RefreshGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Whether a refresh is currently in flight
    pub(crate) fn is_refreshing(&self) -> bool {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) async fn run<F, Fut>(&self, refresh: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome>,
    {
        let (inflight, is_leader) = {
            let mut slot = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(existing) => (Arc::clone(existing), false),
                None => {
                    let (tx, rx) = watch::channel(None);
                    let fresh = Arc::new(InFlightRefresh { tx, rx });
                    *slot = Some(Arc::clone(&fresh));
                    (fresh, true)
                }
            }
        };

        if !is_leader {
            debug!("Joining in-flight token refresh");
            let mut rx = inflight.rx.clone();
            drop(inflight);
            loop {
                if let Some(outcome) = rx.borrow_and_update().clone() {
                    return outcome;
                }
                if rx.changed().await.is_err() {
                    return Err(RefreshFailure::Cancelled);
                }
            }
        }

        let guard = LeaderGuard {
            gate: self,
            inflight,
            completed: false,
        };
        let outcome = refresh().await;
        guard.complete(outcome)
    }

    fn release(&self, inflight: &Arc<InFlightRefresh>, outcome: RefreshOutcome) {
        {
            let mut slot = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, inflight)) {
                *slot = None;
            }
        }
        let _ = inflight.tx.send(Some(outcome));
    }
}

/// Publishes `Cancelled` to waiters if the leader future is dropped mid-refresh.
struct LeaderGuard<'a> {
    gate: &'a RefreshGate,
    inflight: Arc<InFlightRefresh>,
    completed: bool,
}

impl LeaderGuard<'_> {
    fn complete(mut self, outcome: RefreshOutcome) -> RefreshOutcome {
        self.completed = true;
        self.gate.release(&self.inflight, outcome.clone());
        outcome
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.gate
                .release(&self.inflight, Err(RefreshFailure::Cancelled));
        }
    }
}
