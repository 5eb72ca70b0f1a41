use crate::domain::cart::{MAX_QUANTITY, MIN_QUANTITY, QuantityLimits};
use crate::error::{Result, StoreError};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_VERSION: &str = "2024-04";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Store settings, read from an optional JSON file and then overridden by
/// command-line flags.
///
/// Every field has a default, so `{}` is a valid (offline) configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Storefront host, e.g. `example.myshopify.com`. A value that already
    /// carries an `http://` or `https://` scheme is used verbatim.
    pub shop_domain: String,
    /// Public storefront access token.
    pub access_token: String,
    pub locale: Option<String>,
    pub api_version: String,
    pub min_quantity: u32,
    pub max_quantity: u32,
    pub request_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shop_domain: String::new(),
            access_token: String::new(),
            locale: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            min_quantity: MIN_QUANTITY,
            max_quantity: MAX_QUANTITY,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl StoreConfig {
    pub fn from_json_reader<R: Read>(source: R) -> Result<Self> {
        let config: Self = serde_json::from_reader(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_json_reader(BufReader::new(file))
    }

    pub fn validate(&self) -> Result<()> {
        self.quantity_limits()?;
        if self.api_version.trim().is_empty() {
            return Err(StoreError::ConfigError(
                "api_version must not be empty".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(StoreError::ConfigError(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn quantity_limits(&self) -> Result<QuantityLimits> {
        QuantityLimits::new(self.min_quantity, self.max_quantity)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn has_credentials(&self) -> bool {
        !self.shop_domain.trim().is_empty() && !self.access_token.trim().is_empty()
    }

    fn shop_origin(&self) -> String {
        let domain = self.shop_domain.trim().trim_end_matches('/');
        if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        }
    }

    /// Storefront GraphQL endpoint for the configured shop and API version.
    pub fn graphql_endpoint(&self) -> Result<String> {
        if self.shop_domain.trim().is_empty() {
            return Err(StoreError::ConfigError(
                "shop_domain is required to reach the storefront".to_string(),
            ));
        }
        Ok(format!(
            "{}/api/{}/graphql.json",
            self.shop_origin(),
            self.api_version
        ))
    }

    /// Host used when minting local checkout URLs.
    pub fn checkout_host(&self) -> String {
        if self.shop_domain.trim().is_empty() {
            "localhost".to_string()
        } else {
            self.shop_domain
                .trim()
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/')
                .to_string()
        }
    }
}
