//! Error types for ledger operations.

use crate::AccountName;
use thiserror::Error;

/// Main error type for ledger operations.
///
/// Every variant is scoped to the call that produced it: the ledger is left
/// exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Account name is empty or otherwise unusable.
    #[error("Invalid account name: {reason}")]
    InvalidName { reason: String },

    /// No account with this name exists.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountName),

    /// Account already exists and the store rejects re-creation.
    #[error("Account already exists: {0}")]
    AccountExists(AccountName),

    /// Amount is not of an integral type.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Applying the change would leave the account with a negative balance.
    #[error("Account {account} would be overdrawn: balance {balance}, change {change}")]
    Overdrawn {
        account: AccountName,
        balance: i64,
        change: i64,
    },

    /// The resulting balance does not fit in a 64-bit amount.
    #[error("Amount overflow on account {account}")]
    AmountOverflow { account: AccountName },
}

impl LedgerError {
    /// Create an invalid name error.
    pub fn invalid_name(reason: impl Into<String>) -> Self {
        LedgerError::InvalidName {
            reason: reason.into(),
        }
    }

    /// Check if this error is retryable.
    ///
    /// None of the ledger errors are: each one needs different arguments or
    /// a different ledger state before the same call can succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Get a stable error code for callers that expose errors on the wire.
    pub fn error_code(&self) -> &'static str {
        match self {
            LedgerError::InvalidName { .. } => "INVALID_NAME",
            LedgerError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            LedgerError::AccountExists(_) => "ACCOUNT_EXISTS",
            LedgerError::InvalidAmount(_) => "INVALID_AMOUNT",
            LedgerError::Overdrawn { .. } => "OVERDRAWN",
            LedgerError::AmountOverflow { .. } => "AMOUNT_OVERFLOW",
        }
    }
}

/// Result type alias for ledger operations.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
