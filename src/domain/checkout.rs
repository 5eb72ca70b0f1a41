use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle naming a remote checkout session.
///
/// Never empty. Once built the value cannot be changed, so a watcher bound to
/// a `CheckoutId` always reports against the identifier it was created with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CheckoutId(String);

impl CheckoutId {
    pub fn new(value: impl Into<String>) -> Result<Self, StoreError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(StoreError::ValidationError(
                "Checkout id must not be empty".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CheckoutId {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CheckoutId> for String {
    fn from(id: CheckoutId) -> Self {
        id.0
    }
}

impl fmt::Display for CheckoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatcherState {
    Active,
    Completed,
    Abandoned,
}

impl WatcherState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a status query did not produce an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Network trouble, timeouts, throttling. The checkout may still resolve.
    Transient(String),
    /// The oracle no longer recognises the identifier (expired, invalidated
    /// or malformed). All of these end the watch.
    Unresolvable(String),
}

impl FailureReason {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Unresolvable(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Transient(message) | Self::Unresolvable(message) => message,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient(message) => write!(f, "transient: {message}"),
            Self::Unresolvable(message) => write!(f, "unresolvable: {message}"),
        }
    }
}

/// The answer to a single status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusQueryResult {
    Pending,
    Completed,
    QueryFailed(FailureReason),
}

/// Terminal report delivered to a watcher's owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CheckoutOutcome {
    Completed(CheckoutId),
    Abandoned(CheckoutId),
}

impl CheckoutOutcome {
    pub fn checkout(&self) -> &CheckoutId {
        match self {
            Self::Completed(id) | Self::Abandoned(id) => id,
        }
    }

    pub fn state(&self) -> WatcherState {
        match self {
            Self::Completed(_) => WatcherState::Completed,
            Self::Abandoned(_) => WatcherState::Abandoned,
        }
    }
}

/// A checkout opened by the gateway, ready to be handed to the customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: CheckoutId,
    pub web_url: String,
}
