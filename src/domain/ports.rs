use super::cart::{Cart, CartId};
use super::checkout::{CheckoutId, CheckoutSession, StatusQueryResult};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Answers "is checkout X complete?".
///
/// Every outcome, failures included, is expressed as a `StatusQueryResult`;
/// implementations decide which failures are transient and which mean the
/// identifier is gone.
#[async_trait]
pub trait StatusOracle: Send + Sync {
    async fn query_status(&self, checkout: &CheckoutId) -> StatusQueryResult;
}

/// Opens a hosted checkout for the contents of a cart.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn create_checkout(&self, cart_id: &CartId, cart: &Cart) -> Result<CheckoutSession>;
}

pub type StatusOracleArc = Arc<dyn StatusOracle>;
pub type CheckoutGatewayBox = Box<dyn CheckoutGateway>;
