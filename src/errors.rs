use crate::models::AccountNumber;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),
    #[error("account #{0} already exists")]
    DuplicateAccount(AccountNumber),
    #[error("account #{0} not found")]
    NotFound(AccountNumber),
    #[error("missing amount")]
    MissingAmount,
    #[error("amount '{0}' is not a number")]
    MalformedAmount(String),
    #[error("amount must be positive")]
    InvalidAmount,
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },
    #[error("journal write failed: {0}")]
    Journal(String),
}

impl LedgerError {
    /// Stable machine-readable code reported alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "VALIDATION_ERROR",
            LedgerError::DuplicateAccount(_) => "DUPLICATE_ACCOUNT",
            LedgerError::NotFound(_) => "NOT_FOUND",
            LedgerError::MissingAmount => "MISSING_AMOUNT",
            LedgerError::MalformedAmount(_) | LedgerError::InvalidAmount => "INVALID_AMOUNT",
            LedgerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            LedgerError::Journal(_) => "JOURNAL_ERROR",
        }
    }

    pub fn is_client_error(&self) -> bool {
        !matches!(self, LedgerError::Journal(_))
    }
}
