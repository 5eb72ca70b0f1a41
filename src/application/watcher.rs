use super::lock;
use crate::domain::checkout::{CheckoutId, CheckoutOutcome, FailureReason, StatusQueryResult, WatcherState};
use crate::domain::ports::StatusOracleArc;
use crate::domain::watch::{PollDecision, Transition, WatchCycle};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub type OutcomeCallback = Box<dyn FnOnce(CheckoutOutcome) + Send + 'static>;
pub type DiagnosticCallback = Arc<dyn Fn(&CheckoutId, &FailureReason) + Send + Sync + 'static>;

struct Shared {
    cycle: WatchCycle,
    on_outcome: Option<OutcomeCallback>,
    on_diagnostic: Option<DiagnosticCallback>,
}

/// Polls a status oracle for one checkout until it completes or is abandoned.
///
/// The watcher has no clock of its own. Its owner decides when to call
/// [`CheckoutWatcher::poll`]; each call sends at most one query, and calls made
/// while a query is outstanding or after the watch has ended are dropped.
/// The completion callback fires once, with the terminal outcome.
///
/// Dropping the watcher disposes it: a response that lands afterwards is
/// discarded and no callback runs.
pub struct CheckoutWatcher {
    checkout: CheckoutId,
    oracle: StatusOracleArc,
    shared: Arc<Mutex<Shared>>,
}

impl CheckoutWatcher {
    /// Creates an `Active` watcher. No query is sent until the first poll.
    pub fn create(checkout: CheckoutId, oracle: StatusOracleArc) -> Self {
        let shared = Shared {
            cycle: WatchCycle::new(checkout.clone()),
            on_outcome: None,
            on_diagnostic: None,
        };
        Self {
            checkout,
            oracle,
            shared: Arc::new(Mutex::new(shared)),
        }
    }

    /// Registers the completion callback, replacing any earlier one.
    pub fn on_outcome<F>(self, callback: F) -> Self
    where
        F: FnOnce(CheckoutOutcome) + Send + 'static,
    {
        lock(&self.shared).on_outcome = Some(Box::new(callback));
        self
    }

    /// Registers a listener for transient query failures.
    pub fn on_diagnostic<F>(self, callback: F) -> Self
    where
        F: Fn(&CheckoutId, &FailureReason) + Send + Sync + 'static,
    {
        lock(&self.shared).on_diagnostic = Some(Arc::new(callback));
        self
    }

    pub fn checkout(&self) -> &CheckoutId {
        &self.checkout
    }

    pub fn state(&self) -> WatcherState {
        lock(&self.shared).cycle.state()
    }

    /// True until the watch ends or the watcher is disposed.
    pub fn is_active(&self) -> bool {
        lock(&self.shared).cycle.is_live()
    }

    pub fn in_flight(&self) -> bool {
        lock(&self.shared).cycle.in_flight()
    }

    pub fn queries_issued(&self) -> u64 {
        lock(&self.shared).cycle.queries_issued()
    }

    /// Sends one status query if the watcher is idle and still active.
    ///
    /// Returns the handle of the task carrying the query so the caller can
    /// wait for it to settle. `None` means the poll was ignored.
    pub fn poll(&self) -> Option<JoinHandle<()>> {
        let Ok(runtime) = Handle::try_current() else {
            warn!(checkout = %self.checkout, "poll outside of an async runtime ignored");
            return None;
        };

        match lock(&self.shared).cycle.begin_query() {
            PollDecision::Dispatch => {}
            PollDecision::Busy => {
                debug!(checkout = %self.checkout, "query already in flight, poll dropped");
                return None;
            }
            PollDecision::Inert => return None,
        }

        debug!(checkout = %self.checkout, "querying checkout status");
        let oracle = Arc::clone(&self.oracle);
        let query = InFlightQuery {
            shared: Arc::clone(&self.shared),
            checkout: self.checkout.clone(),
            settled: false,
        };
        Some(runtime.spawn(async move {
            let result = oracle.query_status(&query.checkout).await;
            query.settle(result);
        }))
    }

    /// Stops the watch. Outstanding responses are ignored from here on.
    pub fn dispose(&self) {
        let mut shared = lock(&self.shared);
        if shared.cycle.is_disposed() {
            return;
        }
        shared.cycle.dispose();
        shared.on_outcome = None;
        shared.on_diagnostic = None;
        debug!(checkout = %self.checkout, "watcher disposed");
    }
}

impl Drop for CheckoutWatcher {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// One outstanding query. If it is dropped without an answer (the oracle
/// panicked or the task was aborted) the watcher's in-flight slot is freed so
/// later polls can go out.
struct InFlightQuery {
    shared: Arc<Mutex<Shared>>,
    checkout: CheckoutId,
    settled: bool,
}

impl InFlightQuery {
    fn settle(mut self, result: StatusQueryResult) {
        self.settled = true;
        settle(&self.shared, &self.checkout, result);
    }
}

impl Drop for InFlightQuery {
    fn drop(&mut self) {
        if !self.settled && lock(&self.shared).cycle.release_query() {
            warn!(checkout = %self.checkout, "status query ended without an answer");
        }
    }
}

/// Applies a response; callbacks run after the lock is released.
fn settle(shared: &Mutex<Shared>, checkout: &CheckoutId, result: StatusQueryResult) {
    let mut guard = lock(shared);
    match guard.cycle.resolve(&result) {
        Transition::Unchanged => {
            debug!(checkout = %checkout, "checkout still pending");
        }
        Transition::Diagnostic(reason) => {
            let listener = guard.on_diagnostic.clone();
            drop(guard);
            warn!(checkout = %checkout, error = reason.message(), "checkout status query failed");
            if let Some(listener) = listener {
                listener(checkout, &reason);
            }
        }
        Transition::Terminal(outcome) => {
            let callback = guard.on_outcome.take();
            guard.on_diagnostic = None;
            drop(guard);
            match &outcome {
                CheckoutOutcome::Completed(_) => info!(checkout = %checkout, "checkout completed"),
                CheckoutOutcome::Abandoned(_) => {
                    debug!(checkout = %checkout, "checkout no longer resolvable, abandoning watch")
                }
            }
            if let Some(callback) = callback {
                callback(outcome);
            }
        }
        Transition::Stale => {
            debug!(checkout = %checkout, "late status response ignored");
        }
    }
}
