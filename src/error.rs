use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Unknown variant: {0}")]
    UnknownVariant(String),
    #[error("Cart '{0}' is empty")]
    EmptyCart(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
