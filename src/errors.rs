use thiserror::Error;
use uuid::Uuid;

/// Unified error type for the ledger core.
///
/// Synchronous ledger operations propagate these directly to the caller; the
/// scheduled jobs catch per-record failures and only let run-level errors
/// escape.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),
    #[error("Credit card not found: {0}")]
    CreditCardNotFound(Uuid),
    #[error("Expense not found: {0}")]
    ExpenseNotFound(Uuid),
    #[error("Loan not found: {0}")]
    LoanNotFound(Uuid),
    #[error("Insufficient funds in account")]
    InsufficientFunds,
    #[error("Payment amount exceeds remaining balance")]
    PaymentExceedsRemaining,
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Transaction conflict: retries exhausted after {0} attempts")]
    Conflict(u32),
    #[error("Persistence error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serde(err.to_string())
    }
}
