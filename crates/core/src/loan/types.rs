//! Loan domain types and application validation.

use corebank_shared::types::money::{MAX_MONEY, has_cent_precision};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::error::LoanError;

/// Smallest principal accepted.
pub const MIN_PRINCIPAL: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);
/// Highest annual interest rate (percent).
pub const MAX_INTEREST_RATE: Decimal = Decimal::from_parts(30, 0, 0, false, 0);
/// Shortest tenure in months.
pub const MIN_TENURE_MONTHS: u32 = 6;
/// Longest tenure in months.
pub const MAX_TENURE_MONTHS: u32 = 360;

text_enum! {
    /// Loan product.
    LoanType {
        /// Personal loan.
        Personal => "personal",
        /// Home loan.
        Home => "home",
        /// Education loan.
        Education => "education",
        /// Business loan.
        Business => "business",
        /// Vehicle loan.
        Vehicle => "vehicle",
    }
}

text_enum! {
    /// Applicant employment status.
    EmploymentStatus {
        /// Salaried.
        Employed => "employed",
        /// Self-employed.
        SelfEmployed => "self_employed",
        /// Business owner.
        Business => "business",
        /// Student.
        Student => "student",
    }
}

text_enum! {
    /// Loan lifecycle status.
    LoanStatus {
        /// Awaiting an admin decision.
        Requested => "requested",
        /// Disbursed and being repaid.
        Active => "active",
        /// An EMI could not be collected.
        Overdue => "overdue",
        /// Fully repaid.
        Paid => "paid",
        /// Declined by an admin.
        Rejected => "rejected",
    }
}

impl LoanStatus {
    /// Returns true if the status machine allows moving to `next`.
    ///
    /// `paid → active` is not listed: it only happens when an EMI deduction is
    /// reversed, which goes through `LoanProgress::revert_installment`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Requested, Self::Active | Self::Rejected)
                | (Self::Active, Self::Paid | Self::Overdue)
                | (Self::Overdue, Self::Active | Self::Paid)
        )
    }

    /// Checks a transition.
    ///
    /// # Errors
    ///
    /// Returns `LoanError::InvalidTransition` when not allowed.
    pub const fn transition_to(self, next: Self) -> Result<Self, LoanError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(LoanError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Active and overdue loans accept installments.
    #[must_use]
    pub const fn is_repayable(self) -> bool {
        matches!(self, Self::Active | Self::Overdue)
    }
}

/// A loan application.
#[derive(Debug, Clone, Deserialize)]
pub struct LoanApplication {
    /// Account that receives the disbursement and pays the EMIs.
    pub account_id: Uuid,
    /// Loan product.
    pub loan_type: LoanType,
    /// Principal.
    pub principal: Decimal,
    /// Annual interest rate in percent.
    pub interest_rate: Decimal,
    /// Tenure in months.
    pub tenure_months: u32,
    /// Stated purpose.
    pub purpose: String,
    /// Employment status.
    pub employment_status: EmploymentStatus,
    /// Monthly income.
    pub monthly_income: Decimal,
}

impl LoanApplication {
    /// Validates the application terms.
    pub fn validate(&self) -> Result<(), LoanError> {
        validate_terms(self.principal, self.interest_rate, self.tenure_months)?;
        if self.purpose.trim().chars().count() < 10 {
            return Err(LoanError::PurposeTooShort);
        }
        if self.monthly_income.is_sign_negative() && !self.monthly_income.is_zero() {
            return Err(LoanError::NegativeIncome);
        }
        Ok(())
    }
}

/// Validates principal, rate and tenure.
pub fn validate_terms(
    principal: Decimal,
    interest_rate: Decimal,
    tenure_months: u32,
) -> Result<(), LoanError> {
    if principal < MIN_PRINCIPAL {
        return Err(LoanError::PrincipalTooSmall {
            min: MIN_PRINCIPAL,
            actual: principal,
        });
    }
    if principal > MAX_MONEY {
        return Err(LoanError::PrincipalTooLarge {
            max: MAX_MONEY,
            actual: principal,
        });
    }
    if !has_cent_precision(principal) {
        return Err(LoanError::PrincipalTooPrecise);
    }
    if interest_rate < Decimal::ZERO || interest_rate > MAX_INTEREST_RATE {
        return Err(LoanError::InvalidInterestRate(interest_rate));
    }
    if !(MIN_TENURE_MONTHS..=MAX_TENURE_MONTHS).contains(&tenure_months) {
        return Err(LoanError::InvalidTenure(tenure_months));
    }
    Ok(())
}

/// Validates an admin's rejection reason.
pub fn validate_rejection_reason(reason: &str) -> Result<(), LoanError> {
    if reason.trim().chars().count() < 5 {
        Err(LoanError::ReasonTooShort)
    } else {
        Ok(())
    }
}
