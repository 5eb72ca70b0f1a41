use crate::domain::cart::{Cart, CartId};
use crate::domain::checkout::{CheckoutId, CheckoutSession, StatusQueryResult};
use crate::domain::ports::{CheckoutGateway, StatusOracle};
use crate::error::{Result, StoreError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// An oracle that replays scripted answers per checkout.
///
/// Answers are consumed in the order they were pushed; once a checkout's
/// script runs out it reports `Pending`. Clones share the same script, so a
/// test can keep one handle and give another to a watcher.
#[derive(Default, Clone)]
pub struct ScriptedStatusOracle {
    scripts: Arc<RwLock<HashMap<CheckoutId, VecDeque<StatusQueryResult>>>>,
    queries: Arc<RwLock<HashMap<CheckoutId, u64>>>,
}

impl ScriptedStatusOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the next answer for `checkout`.
    pub async fn push(&self, checkout: CheckoutId, result: StatusQueryResult) {
        let mut scripts = self.scripts.write().await;
        scripts.entry(checkout).or_default().push_back(result);
    }

    pub async fn script<I>(&self, checkout: CheckoutId, results: I)
    where
        I: IntoIterator<Item = StatusQueryResult>,
    {
        let mut scripts = self.scripts.write().await;
        scripts.entry(checkout).or_default().extend(results);
    }

    /// Number of queries received for `checkout`.
    pub async fn queries_for(&self, checkout: &CheckoutId) -> u64 {
        let queries = self.queries.read().await;
        queries.get(checkout).copied().unwrap_or(0)
    }
}

#[async_trait]
impl StatusOracle for ScriptedStatusOracle {
    async fn query_status(&self, checkout: &CheckoutId) -> StatusQueryResult {
        *self
            .queries
            .write()
            .await
            .entry(checkout.clone())
            .or_default() += 1;

        let mut scripts = self.scripts.write().await;
        scripts
            .get_mut(checkout)
            .and_then(VecDeque::pop_front)
            .unwrap_or(StatusQueryResult::Pending)
    }
}

/// Opens checkouts without a backend, numbering them `chk_1`, `chk_2`, ...
#[derive(Debug, Clone)]
pub struct LocalCheckoutGateway {
    host: String,
    issued: Arc<AtomicU64>,
}

impl LocalCheckoutGateway {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            issued: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

impl Default for LocalCheckoutGateway {
    fn default() -> Self {
        Self::new("localhost")
    }
}

#[async_trait]
impl CheckoutGateway for LocalCheckoutGateway {
    async fn create_checkout(&self, cart_id: &CartId, cart: &Cart) -> Result<CheckoutSession> {
        if cart.is_empty() {
            return Err(StoreError::EmptyCart(cart_id.to_string()));
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let id = CheckoutId::new(format!("chk_{n}"))?;
        let web_url = format!("https://{}/checkouts/{id}", self.host);
        Ok(CheckoutSession { id, web_url })
    }
}
