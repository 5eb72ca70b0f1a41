//! Application layer: the checkout watcher, its poll cadences, the event bus
//! and the `Store` context that ties catalog, carts and watchers together.
//!
//! State shared with spawned query tasks lives behind `std::sync::Mutex`.
//! Locks are never held across an `.await` or while user callbacks run.

pub mod cadence;
pub mod events;
pub mod store;
pub mod watcher;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
