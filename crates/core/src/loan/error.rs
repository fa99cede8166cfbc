//! Loan error types.

use corebank_shared::AppError;
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::LoanStatus;

/// Errors raised by loan rules.
#[derive(Debug, Error)]
pub enum LoanError {
    /// Principal below the minimum.
    #[error("Loan amount must be at least {min}, got {actual}")]
    PrincipalTooSmall {
        /// Minimum principal.
        min: Decimal,
        /// Requested principal.
        actual: Decimal,
    },

    /// Principal above the largest single amount.
    #[error("Loan amount must be at most {max}, got {actual}")]
    PrincipalTooLarge {
        /// Maximum principal.
        max: Decimal,
        /// Requested principal.
        actual: Decimal,
    },

    /// Principal has sub-cent precision.
    #[error("Loan amount must have at most 2 decimal places")]
    PrincipalTooPrecise,

    /// Interest rate outside 0-30%.
    #[error("Interest rate must be between 0 and 30, got {0}")]
    InvalidInterestRate(Decimal),

    /// Tenure outside 6-360 months.
    #[error("Tenure must be between 6 and 360 months, got {0}")]
    InvalidTenure(u32),

    /// Purpose too short.
    #[error("Purpose must be at least 10 characters")]
    PurposeTooShort,

    /// Negative monthly income.
    #[error("Monthly income cannot be negative")]
    NegativeIncome,

    /// Rejection without a usable reason.
    #[error("Rejection reason must be at least 5 characters")]
    ReasonTooShort,

    /// The loan cannot move from its current status to the requested one.
    #[error("Loan cannot move from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: LoanStatus,
        /// Requested status.
        to: LoanStatus,
    },

    /// Installments are only collected on active or overdue loans.
    #[error("Loan is not repayable (status: {0})")]
    NotRepayable(LoanStatus),

    /// The scheduled EMI date has not arrived.
    #[error("EMI is not due yet")]
    NotDue,

    /// Arithmetic overflow while computing the EMI.
    #[error("EMI calculation overflowed")]
    Overflow,

    /// Date arithmetic left chrono's supported range.
    #[error("EMI date out of range")]
    DateOutOfRange,
}

impl LoanError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::PrincipalTooSmall { .. } => "PRINCIPAL_TOO_SMALL",
            Self::PrincipalTooLarge { .. } => "PRINCIPAL_TOO_LARGE",
            Self::PrincipalTooPrecise => "PRINCIPAL_TOO_PRECISE",
            Self::InvalidInterestRate(_) => "INVALID_INTEREST_RATE",
            Self::InvalidTenure(_) => "INVALID_TENURE",
            Self::PurposeTooShort => "PURPOSE_TOO_SHORT",
            Self::NegativeIncome => "NEGATIVE_INCOME",
            Self::ReasonTooShort => "REASON_TOO_SHORT",
            Self::InvalidTransition { .. } => "INVALID_LOAN_TRANSITION",
            Self::NotRepayable(_) => "LOAN_NOT_REPAYABLE",
            Self::NotDue => "EMI_NOT_DUE",
            Self::Overflow => "EMI_OVERFLOW",
            Self::DateOutOfRange => "DATE_OUT_OF_RANGE",
        }
    }
}

impl From<LoanError> for AppError {
    fn from(err: LoanError) -> Self {
        match err {
            LoanError::PrincipalTooSmall { .. }
            | LoanError::PrincipalTooLarge { .. }
            | LoanError::PrincipalTooPrecise
            | LoanError::InvalidInterestRate(_)
            | LoanError::InvalidTenure(_)
            | LoanError::PurposeTooShort
            | LoanError::NegativeIncome
            | LoanError::ReasonTooShort => Self::Validation(err.to_string()),
            LoanError::InvalidTransition { .. } | LoanError::NotRepayable(_) | LoanError::NotDue => {
                Self::BusinessRule(err.to_string())
            }
            LoanError::Overflow | LoanError::DateOutOfRange => Self::Internal(err.to_string()),
        }
    }
}
