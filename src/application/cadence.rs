use super::watcher::CheckoutWatcher;
use crate::domain::checkout::WatcherState;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::debug;

/// A source of "poll now" signals.
#[async_trait]
pub trait PollTrigger: Send {
    /// Waits for the next signal. Returns `false` once the source is done.
    async fn next_tick(&mut self) -> bool;
}

/// Sending half of a focus channel, held by whatever knows about focus.
#[derive(Debug, Clone)]
pub struct FocusSignal {
    tx: watch::Sender<bool>,
}

impl FocusSignal {
    pub fn set_focus(&self, has_focus: bool) {
        // Every report counts, even a repeat of the current value.
        self.tx.send_replace(has_focus);
    }
}

/// Fires each time the application reports that it has focus.
#[derive(Debug)]
pub struct FocusTrigger {
    rx: watch::Receiver<bool>,
}

/// Creates a connected focus signal/trigger pair. The application starts out
/// focused; only later reports fire the trigger.
pub fn focus_channel() -> (FocusSignal, FocusTrigger) {
    let (tx, rx) = watch::channel(true);
    (FocusSignal { tx }, FocusTrigger { rx })
}

#[async_trait]
impl PollTrigger for FocusTrigger {
    async fn next_tick(&mut self) -> bool {
        loop {
            if self.rx.changed().await.is_err() {
                return false;
            }
            if *self.rx.borrow_and_update() {
                return true;
            }
        }
    }
}

/// Shortest period an [`IntervalTrigger`] will tick at.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Fires on a fixed period, optionally a bounded number of times.
#[derive(Debug)]
pub struct IntervalTrigger {
    interval: Interval,
    remaining: Option<u32>,
}

impl IntervalTrigger {
    /// The first tick fires immediately. Periods shorter than
    /// [`MIN_INTERVAL`] are raised to it.
    pub fn new(period: Duration, max_ticks: Option<u32>) -> Self {
        let mut interval = tokio::time::interval(period.max(MIN_INTERVAL));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            remaining: max_ticks,
        }
    }
}

#[async_trait]
impl PollTrigger for IntervalTrigger {
    async fn next_tick(&mut self) -> bool {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return false;
            }
            *remaining -= 1;
        }
        self.interval.tick().await;
        true
    }
}

/// Polls `watcher` on every tick of `trigger` until the watch ends or the
/// trigger runs dry. Each query settles before the next tick is awaited.
pub async fn drive<T>(watcher: &CheckoutWatcher, trigger: &mut T) -> WatcherState
where
    T: PollTrigger + ?Sized,
{
    while watcher.is_active() && trigger.next_tick().await {
        if let Some(query) = watcher.poll()
            && query.await.is_err()
        {
            debug!(checkout = %watcher.checkout(), "status query task did not finish");
        }
    }
    watcher.state()
}
