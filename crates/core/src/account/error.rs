//! Account rule violations.

use corebank_shared::AppError;
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::AccountStatus;

/// Errors raised by account rules.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Account is frozen or closed.
    #[error("Account is not active (status: {0})")]
    NotActive(AccountStatus),

    /// Balance does not cover the requested debit.
    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Current balance.
        available: Decimal,
        /// Amount requested.
        requested: Decimal,
    },

    /// FDR accounts need an interest rate and maturity date.
    #[error("Fixed deposit accounts require an interest rate and a maturity date")]
    MissingFdrTerms,

    /// Interest rate outside 0-30%.
    #[error("Interest rate must be between 0 and 30, got {0}")]
    InvalidInterestRate(Decimal),

    /// Maturity date is today or in the past.
    #[error("Maturity date must be in the future")]
    MaturityNotInFuture,

    /// Initial deposit is negative, below the minimum, or has sub-cent precision.
    #[error("Invalid initial deposit: {0}")]
    InvalidInitialDeposit(Decimal),

    /// Initial deposit above the largest single amount.
    #[error("Initial deposit must be at most {max}, got {actual}")]
    InitialDepositTooLarge {
        /// Largest accepted deposit.
        max: Decimal,
        /// Deposit requested.
        actual: Decimal,
    },

    /// Closed accounts cannot change status.
    #[error("Account is closed")]
    Closed,

    /// Accounts can only be closed once emptied.
    #[error("Account balance must be zero before closing (balance: {0})")]
    NonZeroBalance(Decimal),

    /// Requested status equals the current one.
    #[error("Account is already {0}")]
    StatusUnchanged(AccountStatus),
}

impl AccountError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotActive(_) => "ACCOUNT_NOT_ACTIVE",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::MissingFdrTerms => "MISSING_FDR_TERMS",
            Self::InvalidInterestRate(_) => "INVALID_INTEREST_RATE",
            Self::MaturityNotInFuture => "INVALID_MATURITY_DATE",
            Self::InvalidInitialDeposit(_) => "INVALID_INITIAL_DEPOSIT",
            Self::InitialDepositTooLarge { .. } => "INITIAL_DEPOSIT_TOO_LARGE",
            Self::Closed => "ACCOUNT_CLOSED",
            Self::NonZeroBalance(_) => "NON_ZERO_BALANCE",
            Self::StatusUnchanged(_) => "STATUS_UNCHANGED",
        }
    }

    /// True for errors caused by malformed input rather than account state.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingFdrTerms
                | Self::InvalidInterestRate(_)
                | Self::MaturityNotInFuture
                | Self::InvalidInitialDeposit(_)
                | Self::InitialDepositTooLarge { .. }
        )
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        if err.is_validation() {
            Self::Validation(err.to_string())
        } else {
            Self::BusinessRule(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_app_error_mapping() {
        let err: AppError = AccountError::MissingFdrTerms.into();
        assert_eq!(err.status_code(), 400);

        let err: AppError = AccountError::InsufficientBalance {
            available: dec!(10),
            requested: dec!(20),
        }
        .into();
        assert_eq!(err.status_code(), 422);
        assert_eq!(
            err.to_string(),
            "Business rule violation: Insufficient balance: available 10, requested 20"
        );

        let err: AppError = AccountError::InitialDepositTooLarge {
            max: dec!(999999999999.99),
            actual: dec!(1000000000000),
        }
        .into();
        assert_eq!(err.status_code(), 400);
    }
}
