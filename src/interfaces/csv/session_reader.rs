use crate::domain::cart::CartId;
use crate::domain::checkout::{CheckoutId, FailureReason, StatusQueryResult};
use crate::error::{Result, StoreError};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Add,
    Remove,
    Clear,
    Checkout,
    Buy,
    Status,
    Focus,
}

/// One raw `command,cart,target,value` record.
#[derive(Debug, Deserialize)]
struct SessionRow {
    command: CommandKind,
    cart: Option<String>,
    target: Option<String>,
    value: Option<String>,
}

/// A validated step of a scripted storefront session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Add {
        cart: CartId,
        variant: String,
        quantity: u32,
    },
    Remove {
        cart: CartId,
        variant: String,
        quantity: Option<u32>,
    },
    Clear {
        cart: CartId,
    },
    Checkout {
        cart: CartId,
    },
    Buy {
        variant: String,
        quantity: u32,
    },
    /// Scripts the oracle's next answer for a checkout.
    Status {
        checkout: CheckoutId,
        result: StatusQueryResult,
    },
    Focus {
        has_focus: bool,
    },
}

fn required(field: Option<String>, command: CommandKind, name: &str) -> Result<String> {
    field.ok_or_else(|| StoreError::ValidationError(format!("{command:?} requires a {name}")))
}

fn quantity(value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|_| StoreError::ValidationError(format!("Invalid quantity '{value}'")))
}

fn status(value: &str) -> Result<StatusQueryResult> {
    match value {
        "pending" => Ok(StatusQueryResult::Pending),
        "completed" => Ok(StatusQueryResult::Completed),
        "transient" => Ok(StatusQueryResult::QueryFailed(FailureReason::Transient(
            "scripted transient failure".to_string(),
        ))),
        "unresolvable" => Ok(StatusQueryResult::QueryFailed(FailureReason::Unresolvable(
            "scripted unresolvable checkout".to_string(),
        ))),
        other => Err(StoreError::ValidationError(format!(
            "Unknown checkout status '{other}'"
        ))),
    }
}

/// An empty value means focus was regained.
fn focus(value: Option<&str>) -> Result<bool> {
    match value {
        None | Some("gained") => Ok(true),
        Some("lost") => Ok(false),
        Some(other) => Err(StoreError::ValidationError(format!(
            "Unknown focus change '{other}'"
        ))),
    }
}

impl TryFrom<SessionRow> for SessionCommand {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> Result<Self> {
        let cart = row.cart.map(CartId::new).unwrap_or_default();
        let command = row.command;
        Ok(match command {
            CommandKind::Add => Self::Add {
                cart,
                variant: required(row.target, command, "variant")?,
                quantity: row.value.as_deref().map_or(Ok(1), quantity)?,
            },
            CommandKind::Remove => Self::Remove {
                cart,
                variant: required(row.target, command, "variant")?,
                quantity: row.value.as_deref().map(quantity).transpose()?,
            },
            CommandKind::Clear => Self::Clear { cart },
            CommandKind::Checkout => Self::Checkout { cart },
            CommandKind::Buy => Self::Buy {
                variant: required(row.target, command, "variant")?,
                quantity: row.value.as_deref().map_or(Ok(1), quantity)?,
            },
            CommandKind::Status => Self::Status {
                checkout: CheckoutId::new(required(row.target, command, "checkout")?)?,
                result: status(&required(row.value, command, "status")?)?,
            },
            CommandKind::Focus => Self::Focus {
                has_focus: focus(row.value.as_deref())?,
            },
        })
    }
}

/// Reads session commands from a CSV source.
///
/// Rows are parsed lazily; a malformed row yields an `Err` for that row only,
/// so callers can report it and carry on.
pub struct SessionReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> SessionReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn commands(self) -> impl Iterator<Item = Result<SessionCommand>> {
        self.reader
            .into_deserialize::<SessionRow>()
            .map(|row| SessionCommand::try_from(row.map_err(StoreError::from)?))
    }
}
