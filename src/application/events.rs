use super::lock;
use crate::domain::cart::CartId;
use crate::domain::checkout::CheckoutId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CartUpdated,
    CartCleared,
    PurchaseComplete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A line was added, changed or removed. `quantity` is the new item count.
    CartUpdated { cart: CartId, quantity: u32 },
    CartCleared { cart: CartId },
    PurchaseComplete { checkout: CheckoutId },
}

impl StoreEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::CartUpdated { .. } => EventKind::CartUpdated,
            Self::CartCleared { .. } => EventKind::CartCleared,
            Self::PurchaseComplete { .. } => EventKind::PurchaseComplete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

pub type Listener = Arc<dyn Fn(&StoreEvent) + Send + Sync + 'static>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<EventKind, Vec<(SubscriptionId, Listener)>>,
}

/// Observer registry keyed by event kind.
///
/// Listeners of a kind run in subscription order. They are called with the
/// registry unlocked, so a listener may subscribe, unsubscribe or trigger
/// further events.
#[derive(Default)]
pub struct EventBus {
    registry: Mutex<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        registry.next_id += 1;
        let id = SubscriptionId(registry.next_id);
        registry
            .listeners
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Returns `false` if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = lock(&self.registry);
        for listeners in registry.listeners.values_mut() {
            if let Some(index) = listeners.iter().position(|(sid, _)| *sid == id) {
                listeners.remove(index);
                return true;
            }
        }
        false
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        lock(&self.registry)
            .listeners
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Delivers `event` to the listeners of its kind and returns how many ran.
    pub fn publish(&self, event: &StoreEvent) -> usize {
        let listeners: Vec<Listener> = lock(&self.registry)
            .listeners
            .get(&event.kind())
            .map(|l| l.iter().map(|(_, f)| Arc::clone(f)).collect())
            .unwrap_or_default();

        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }
}
