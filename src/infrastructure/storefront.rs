use crate::config::StoreConfig;
use crate::domain::checkout::{CheckoutId, FailureReason, StatusQueryResult};
use crate::domain::ports::StatusOracle;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT_LANGUAGE;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Storefront-Access-Token";

const CHECKOUT_STATUS_QUERY: &str =
    "query CheckoutStatus($id: ID!) { node(id: $id) { ... on Checkout { id completedAt } } }";

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<NodeData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct NodeData {
    node: Option<CheckoutNode>,
}

#[derive(Debug, Deserialize)]
struct CheckoutNode {
    #[serde(rename = "completedAt")]
    completed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Asks a storefront GraphQL endpoint whether a checkout has completed.
///
/// Anything that goes wrong on the way to an answer (connection failures,
/// timeouts, non-2xx statuses, bodies that do not decode) is a transient
/// failure. A GraphQL error such as `Invalid global id`, or a `null` node,
/// means the checkout can no longer be resolved.
///
/// A configured locale is sent with every query as `Accept-Language`.
pub struct StorefrontOracle {
    client: Client,
    endpoint: String,
    access_token: String,
    locale: Option<String>,
}

impl StorefrontOracle {
    pub fn new(
        endpoint: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("cartwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            access_token: access_token.into(),
            locale: None,
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let oracle = Self::new(
            config.graphql_endpoint()?,
            config.access_token.clone(),
            config.request_timeout(),
        )?;
        Ok(match &config.locale {
            Some(locale) => oracle.with_locale(locale.clone()),
            None => oracle,
        })
    }

    /// Asks the storefront to answer in `locale`. Blank values are ignored.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        let locale = locale.into();
        self.locale = (!locale.trim().is_empty()).then(|| locale.trim().to_string());
        self
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    async fn fetch(&self, checkout: &CheckoutId) -> std::result::Result<GraphQlResponse, FailureReason> {
        let body = json!({
            "query": CHECKOUT_STATUS_QUERY,
            "variables": { "id": checkout.as_str() },
        });

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(ACCESS_TOKEN_HEADER, &self.access_token);
        if let Some(locale) = &self.locale {
            request = request.header(ACCEPT_LANGUAGE, locale);
        }

        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| FailureReason::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FailureReason::Transient(format!(
                "unexpected HTTP status {}",
                status.as_u16()
            )));
        }

        response
            .json::<GraphQlResponse>()
            .await
            .map_err(|e| FailureReason::Transient(format!("undecodable response: {e}")))
    }
}

fn interpret(response: GraphQlResponse) -> StatusQueryResult {
    if !response.errors.is_empty() {
        let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
        return StatusQueryResult::QueryFailed(FailureReason::Unresolvable(messages.join("; ")));
    }

    match response.data.and_then(|data| data.node) {
        None => StatusQueryResult::QueryFailed(FailureReason::Unresolvable(
            "checkout not found".to_string(),
        )),
        Some(CheckoutNode {
            completed_at: Some(_),
        }) => StatusQueryResult::Completed,
        Some(CheckoutNode { completed_at: None }) => StatusQueryResult::Pending,
    }
}

#[async_trait]
impl StatusOracle for StorefrontOracle {
    async fn query_status(&self, checkout: &CheckoutId) -> StatusQueryResult {
        debug!(checkout = %checkout, endpoint = %self.endpoint, "sending checkout status query");
        match self.fetch(checkout).await {
            Ok(response) => interpret(response),
            Err(reason) => StatusQueryResult::QueryFailed(reason),
        }
    }
}
