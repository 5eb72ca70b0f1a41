use super::events::{EventBus, StoreEvent};
use super::lock;
use super::watcher::CheckoutWatcher;
use crate::config::StoreConfig;
use crate::domain::cart::{Cart, CartId, QuantityLimits};
use crate::domain::catalog::{Catalog, Variant};
use crate::domain::checkout::{CheckoutId, CheckoutOutcome, CheckoutSession};
use crate::domain::ports::{CheckoutGatewayBox, StatusOracleArc};
use crate::error::{Result, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

type Carts = Arc<Mutex<HashMap<CartId, Cart>>>;

/// The storefront context: catalog, carts, change notifications and the
/// watchers of every checkout opened through it.
///
/// One `Store` is built at startup and handed to whoever needs it. Dropping
/// it drops its watchers, which stops their polling.
pub struct Store {
    limits: QuantityLimits,
    catalog: Catalog,
    carts: Carts,
    events: Arc<EventBus>,
    oracle: StatusOracleArc,
    gateway: CheckoutGatewayBox,
    watchers: Mutex<Vec<CheckoutWatcher>>,
    outcomes: Arc<Mutex<Vec<CheckoutOutcome>>>,
}

impl Store {
    /// Creates a new `Store`.
    ///
    /// # Arguments
    ///
    /// * `config` - Quantity limits are taken from here.
    /// * `catalog` - Products that may be added to carts.
    /// * `oracle` - Answers checkout status queries for the watchers.
    /// * `gateway` - Opens hosted checkouts.
    pub fn new(
        config: &StoreConfig,
        catalog: Catalog,
        oracle: StatusOracleArc,
        gateway: CheckoutGatewayBox,
    ) -> Result<Self> {
        Ok(Self {
            limits: config.quantity_limits()?,
            catalog,
            carts: Arc::default(),
            events: Arc::new(EventBus::new()),
            oracle,
            gateway,
            watchers: Mutex::default(),
            outcomes: Arc::default(),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn limits(&self) -> QuantityLimits {
        self.limits
    }

    /// Subscribe here for cart and purchase notifications.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn variant(&self, variant_id: &str) -> Result<&Variant> {
        self.catalog
            .find_variant(variant_id)
            .map(|(_, variant)| variant)
            .ok_or_else(|| StoreError::UnknownVariant(variant_id.to_string()))
    }

    /// Snapshot of a cart. Carts that were never touched are empty.
    pub fn cart(&self, cart_id: &CartId) -> Cart {
        lock(&self.carts).get(cart_id).cloned().unwrap_or_default()
    }

    /// Ids of every cart that currently holds items, sorted.
    pub fn cart_ids(&self) -> Vec<CartId> {
        let mut ids: Vec<CartId> = lock(&self.carts)
            .iter()
            .filter(|(_, cart)| !cart.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn cart_quantity(&self, cart_id: &CartId) -> u32 {
        lock(&self.carts).get(cart_id).map_or(0, Cart::quantity)
    }

    /// Adds items of a variant to a cart and returns the line's new quantity,
    /// kept within the store's quantity limits.
    pub fn add_to_cart(&self, variant_id: &str, quantity: u32, cart_id: &CartId) -> Result<u32> {
        let variant = self.variant(variant_id)?;
        let line_quantity = lock(&self.carts)
            .entry(cart_id.clone())
            .or_default()
            .add(variant, quantity, self.limits);
        debug!(cart = %cart_id, variant = %variant.id, quantity = line_quantity, "cart line updated");
        self.notify_cart_updated(cart_id);
        Ok(line_quantity)
    }

    /// Removes `quantity` items of a variant, or the whole line for `None`.
    /// Returns what is left on the line.
    pub fn remove_from_cart(
        &self,
        variant_id: &str,
        quantity: Option<u32>,
        cart_id: &CartId,
    ) -> Result<u32> {
        let variant = self.variant(variant_id)?;
        let remaining = lock(&self.carts)
            .get_mut(cart_id)
            .map_or(0, |cart| cart.remove(&variant.id, quantity));
        self.notify_cart_updated(cart_id);
        Ok(remaining)
    }

    /// Empties a cart and forgets its checkout.
    pub fn clear_cart(&self, cart_id: &CartId) {
        if let Some(cart) = lock(&self.carts).get_mut(cart_id) {
            cart.reset();
        }
        self.events.publish(&StoreEvent::CartCleared {
            cart: cart_id.clone(),
        });
        self.notify_cart_updated(cart_id);
    }

    /// Announces the cart's current size to `CartUpdated` listeners.
    pub fn notify_cart_updated(&self, cart_id: &CartId) {
        let quantity = self.cart_quantity(cart_id);
        self.events.publish(&StoreEvent::CartUpdated {
            cart: cart_id.clone(),
            quantity,
        });
    }

    /// Opens a hosted checkout for a cart and starts watching it.
    pub async fn check_out(&self, cart_id: &CartId) -> Result<CheckoutSession> {
        let snapshot = self.cart(cart_id);
        if snapshot.is_empty() {
            return Err(StoreError::EmptyCart(cart_id.to_string()));
        }

        let session = self.gateway.create_checkout(cart_id, &snapshot).await?;
        if let Some(cart) = lock(&self.carts).get_mut(cart_id) {
            cart.set_current_checkout(session.id.clone());
        }
        self.watch_checkout(session.id.clone());

        info!(cart = %cart_id, checkout = %session.id, url = %session.web_url, "checkout opened");
        Ok(session)
    }

    /// Checks out exactly `quantity` of one variant through the buy-now cart,
    /// leaving the other carts alone.
    pub async fn one_shot_checkout(&self, variant_id: &str, quantity: u32) -> Result<CheckoutSession> {
        let buy_now = CartId::buy_now();
        let variant = self.variant(variant_id)?;
        lock(&self.carts)
            .entry(buy_now.clone())
            .or_default()
            .set(variant, quantity, self.limits);
        self.check_out(&buy_now).await
    }

    /// Starts watching a checkout. A completed checkout is announced with
    /// `PurchaseComplete` and clears every cart it was opened from.
    pub fn watch_checkout(&self, checkout: CheckoutId) {
        let carts = Arc::clone(&self.carts);
        let events = Arc::clone(&self.events);
        let outcomes = Arc::clone(&self.outcomes);

        let watcher = CheckoutWatcher::create(checkout, Arc::clone(&self.oracle)).on_outcome(
            move |outcome| {
                lock(&outcomes).push(outcome.clone());
                match outcome {
                    CheckoutOutcome::Completed(id) => complete_purchase(&carts, &events, &id),
                    CheckoutOutcome::Abandoned(id) => {
                        debug!(checkout = %id, "checkout abandoned, dropping watch")
                    }
                }
            },
        );
        lock(&self.watchers).push(watcher);
    }

    /// Poll cadence hook: each time the application regains focus, finished
    /// watchers are discarded and the rest send one query each.
    ///
    /// Returns the handles of the queries that went out.
    pub fn application_focus(&self, has_focus: bool) -> Vec<JoinHandle<()>> {
        if !has_focus {
            return Vec::new();
        }
        let mut watchers = lock(&self.watchers);
        watchers.retain(CheckoutWatcher::is_active);
        watchers.iter().filter_map(CheckoutWatcher::poll).collect()
    }

    pub fn active_watchers(&self) -> usize {
        lock(&self.watchers)
            .iter()
            .filter(|w| w.is_active())
            .count()
    }

    /// Terminal outcomes reported so far, in arrival order.
    pub fn outcomes(&self) -> Vec<CheckoutOutcome> {
        lock(&self.outcomes).clone()
    }

    /// Disposes every watcher. Responses still in flight are ignored.
    pub fn shutdown(&self) {
        let watchers: Vec<CheckoutWatcher> = lock(&self.watchers).drain(..).collect();
        for watcher in &watchers {
            watcher.dispose();
        }
        info!(disposed = watchers.len(), "store shut down");
    }
}

fn complete_purchase(carts: &Mutex<HashMap<CartId, Cart>>, events: &EventBus, checkout: &CheckoutId) {
    events.publish(&StoreEvent::PurchaseComplete {
        checkout: checkout.clone(),
    });

    let mut cleared: Vec<CartId> = lock(carts)
        .iter_mut()
        .filter(|(_, cart)| cart.current_checkout() == Some(checkout))
        .map(|(id, cart)| {
            cart.reset();
            id.clone()
        })
        .collect();
    cleared.sort();

    for cart in cleared {
        events.publish(&StoreEvent::CartCleared { cart: cart.clone() });
        events.publish(&StoreEvent::CartUpdated { cart, quantity: 0 });
    }
}
