#![allow(dead_code)]

use async_trait::async_trait;
use cartwatch::domain::catalog::{Catalog, Product, SelectedOption, Variant};
use cartwatch::domain::checkout::{CheckoutId, CheckoutOutcome, StatusQueryResult};
use cartwatch::domain::ports::StatusOracle;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

pub fn id(value: &str) -> CheckoutId {
    CheckoutId::new(value).unwrap()
}

/// An oracle whose answers are held back until the test releases them.
///
/// Each query waits for one permit, then returns the next scripted result
/// (`Pending` once the script is exhausted).
#[derive(Clone)]
pub struct GatedOracle {
    gate: Arc<Semaphore>,
    script: Arc<Mutex<VecDeque<StatusQueryResult>>>,
    started: Arc<AtomicUsize>,
}

impl GatedOracle {
    pub fn new(script: Vec<StatusQueryResult>) -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            script: Arc::new(Mutex::new(script.into())),
            started: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Lets `n` held queries answer.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Queries that have reached the oracle so far.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Waits until at least `n` queries have reached the oracle.
    pub async fn wait_started(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.started() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("queries never reached the oracle");
    }
}

#[async_trait]
impl StatusOracle for GatedOracle {
    async fn query_status(&self, _checkout: &CheckoutId) -> StatusQueryResult {
        self.started.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(StatusQueryResult::Pending)
    }
}

/// Collects outcomes delivered to a completion callback.
#[derive(Clone, Default)]
pub struct OutcomeLog(Arc<Mutex<Vec<CheckoutOutcome>>>);

impl OutcomeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> impl FnOnce(CheckoutOutcome) + Send + 'static {
        let log = Arc::clone(&self.0);
        move |outcome| log.lock().unwrap().push(outcome)
    }

    pub fn entries(&self) -> Vec<CheckoutOutcome> {
        self.0.lock().unwrap().clone()
    }
}

fn variant(id: u64, title: &str, price: Decimal, options: &[(&str, &str)]) -> Variant {
    Variant {
        id: format!("gid://shopify/ProductVariant/{id}"),
        title: title.to_string(),
        price,
        available_for_sale: true,
        selected_options: options
            .iter()
            .map(|(name, value)| SelectedOption {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect(),
    }
}

/// Two products: a tee in two sizes (101, 102) and a mug (201).
pub fn sample_catalog() -> Catalog {
    Catalog::new(vec![
        Product {
            id: "gid://shopify/Product/1".to_string(),
            title: "Tee".to_string(),
            description: String::new(),
            variants: vec![
                variant(101, "Small", Decimal::new(1999, 2), &[("Size", "Small")]),
                variant(102, "Large", Decimal::new(2150, 2), &[("Size", "Large")]),
            ],
        },
        Product {
            id: "gid://shopify/Product/2".to_string(),
            title: "Mug".to_string(),
            description: String::new(),
            variants: vec![variant(201, "Default Title", Decimal::new(800, 2), &[])],
        },
    ])
}
