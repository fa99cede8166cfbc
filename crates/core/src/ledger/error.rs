//! Ledger error types.

use corebank_shared::AppError;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use super::types::TransactionType;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Amount below the 1.00 minimum.
    #[error("Amount must be at least 1.00, got {0}")]
    AmountTooSmall(Decimal),

    /// Amount above the single-posting maximum.
    #[error("Amount must be at most {max}, got {actual}")]
    AmountTooLarge {
        /// Maximum accepted amount.
        max: Decimal,
        /// Requested amount.
        actual: Decimal,
    },

    /// Amount has more than two decimal places.
    #[error("Amount must have at most 2 decimal places, got {0}")]
    AmountTooPrecise(Decimal),

    /// Description exceeds the length limit.
    #[error("Description must be at most {max} characters, got {actual}")]
    DescriptionTooLong {
        /// Maximum allowed characters.
        max: usize,
        /// Actual length.
        actual: usize,
    },

    /// Source and destination are the same account.
    #[error("Cannot transfer to the same account")]
    SameAccount,

    /// Month or year out of range for a statement.
    #[error("Invalid statement period: {month}/{year}")]
    InvalidStatementPeriod {
        /// Requested month.
        month: u32,
        /// Requested year.
        year: i32,
    },

    // ========== Balance Errors ==========
    /// Applying the entry would leave a negative balance.
    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Balance before the entry.
        available: Decimal,
        /// Debit amount requested.
        requested: Decimal,
    },

    /// Applying the entry would push the balance past the account limit.
    #[error("Balance limit exceeded: balance {balance}, amount {amount}")]
    BalanceLimitExceeded {
        /// Balance before the entry.
        balance: Decimal,
        /// Credit amount requested.
        amount: Decimal,
    },

    // ========== Reversal Errors ==========
    /// Transaction was already reversed.
    #[error("Transaction {0} is already reversed")]
    AlreadyReversed(Uuid),

    /// Reversal rows cannot themselves be reversed.
    #[error("Reversal entries cannot be reversed")]
    CannotReverseReversal,

    /// Some types are settled through their own workflow.
    #[error("Transactions of type {0} cannot be reversed")]
    NotReversible(TransactionType),

    /// A transfer leg lost its counterpart.
    #[error("Transfer {0} has no counterpart leg")]
    MissingCounterpart(Uuid),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AmountTooSmall(_) => "AMOUNT_TOO_SMALL",
            Self::AmountTooLarge { .. } => "AMOUNT_TOO_LARGE",
            Self::AmountTooPrecise(_) => "AMOUNT_TOO_PRECISE",
            Self::DescriptionTooLong { .. } => "DESCRIPTION_TOO_LONG",
            Self::SameAccount => "SAME_ACCOUNT",
            Self::InvalidStatementPeriod { .. } => "INVALID_STATEMENT_PERIOD",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::BalanceLimitExceeded { .. } => "BALANCE_LIMIT_EXCEEDED",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::CannotReverseReversal => "CANNOT_REVERSE_REVERSAL",
            Self::NotReversible(_) => "NOT_REVERSIBLE",
            Self::MissingCounterpart(_) => "MISSING_COUNTERPART",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::AmountTooSmall(_)
            | Self::AmountTooLarge { .. }
            | Self::AmountTooPrecise(_)
            | Self::DescriptionTooLong { .. }
            | Self::SameAccount
            | Self::InvalidStatementPeriod { .. } => 400,

            // 409 Conflict - transaction state
            Self::AlreadyReversed(_) => 409,

            // 422 Unprocessable - business rules
            Self::InsufficientBalance { .. }
            | Self::BalanceLimitExceeded { .. }
            | Self::CannotReverseReversal
            | Self::NotReversible(_) => 422,

            // 500 Internal Server Error - broken ledger data
            Self::MissingCounterpart(_) => 500,
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err.http_status_code() {
            400 => Self::Validation(err.to_string()),
            409 => Self::Conflict(err.to_string()),
            422 => Self::BusinessRule(err.to_string()),
            _ => Self::Internal(err.to_string()),
        }
    }
}
