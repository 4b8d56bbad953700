use crate::domain::deposit::DepositStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DepositError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Unknown refund scenario: {0}")]
    UnknownScenario(String),
    #[error("hours_before_meetup is required for a cancellation refund")]
    MissingCancellationTiming,
    #[error("Invalid refund policy: {0}")]
    InvalidPolicy(String),
    #[error("Deposit not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Deposit {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: DepositStatus,
        to: DepositStatus,
    },
    #[error("Insufficient points for {user_id}: requested {requested}, available {available}")]
    InsufficientPoints {
        user_id: String,
        requested: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },
    #[error("Payment gateway error: {0}")]
    GatewayError(String),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDBError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl From<reqwest::Error> for DepositError {
    fn from(err: reqwest::Error) -> Self {
        DepositError::GatewayError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DepositError>;
