use super::checkout::{CheckoutId, CheckoutOutcome, FailureReason, StatusQueryResult, WatcherState};

/// What a watcher should do with a poll request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// A query may go out; the cycle now counts it as in flight.
    Dispatch,
    /// A query is already outstanding. The request is dropped, not queued.
    Busy,
    /// Terminal or disposed. Nothing more will be sent.
    Inert,
}

/// Effect of applying one oracle response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Still pending at the oracle.
    Unchanged,
    /// Transient failure; worth telling the owner about, state untouched.
    Diagnostic(FailureReason),
    /// The one and only terminal report.
    Terminal(CheckoutOutcome),
    /// Response arrived with nothing in flight, after disposal, or after a
    /// terminal state. Dropped.
    Stale,
}

/// Runtime-free bookkeeping for watching one checkout.
///
/// Owns the `Active -> {Completed, Abandoned}` transition and the
/// one-query-in-flight rule. Drivers call [`WatchCycle::begin_query`] before
/// sending a query and [`WatchCycle::resolve`] with its answer.
#[derive(Debug, Clone)]
pub struct WatchCycle {
    checkout: CheckoutId,
    state: WatcherState,
    in_flight: bool,
    disposed: bool,
    queries_issued: u64,
}

impl WatchCycle {
    pub fn new(checkout: CheckoutId) -> Self {
        Self {
            checkout,
            state: WatcherState::Active,
            in_flight: false,
            disposed: false,
            queries_issued: 0,
        }
    }

    pub fn checkout(&self) -> &CheckoutId {
        &self.checkout
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn queries_issued(&self) -> u64 {
        self.queries_issued
    }

    /// True while polls can still lead to a query.
    pub fn is_live(&self) -> bool {
        !self.disposed && self.state == WatcherState::Active
    }

    pub fn begin_query(&mut self) -> PollDecision {
        if !self.is_live() {
            return PollDecision::Inert;
        }
        if self.in_flight {
            return PollDecision::Busy;
        }
        self.in_flight = true;
        self.queries_issued += 1;
        PollDecision::Dispatch
    }

    pub fn resolve(&mut self, result: &StatusQueryResult) -> Transition {
        if !self.in_flight {
            return Transition::Stale;
        }
        self.in_flight = false;
        if !self.is_live() {
            return Transition::Stale;
        }

        match result {
            StatusQueryResult::Pending => Transition::Unchanged,
            StatusQueryResult::Completed => {
                self.state = WatcherState::Completed;
                Transition::Terminal(CheckoutOutcome::Completed(self.checkout.clone()))
            }
            StatusQueryResult::QueryFailed(reason) if reason.is_terminal() => {
                self.state = WatcherState::Abandoned;
                Transition::Terminal(CheckoutOutcome::Abandoned(self.checkout.clone()))
            }
            StatusQueryResult::QueryFailed(reason) => Transition::Diagnostic(reason.clone()),
        }
    }

    /// Frees the in-flight slot of a query that ended without an answer.
    /// Returns whether a query was outstanding.
    pub fn release_query(&mut self) -> bool {
        std::mem::replace(&mut self.in_flight, false)
    }

    pub fn dispose(&mut self) {
        self.disposed = true;
    }
}
