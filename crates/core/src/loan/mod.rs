//! Loan origination and EMI amortization.
//!
//! - `types` - loan enums, the status machine and application validation
//! - `emi` - EMI formula, loan totals and the amortization schedule
//! - `progress` - installment bookkeeping and EMI dates

pub mod emi;
pub mod error;
pub mod progress;
pub mod types;

#[cfg(test)]
mod emi_props;

pub use emi::{AmortizationRow, LoanDetails, amortization_schedule, calculate_emi};
pub use error::LoanError;
pub use progress::{
    Installment, LoanProgress, first_emi_date, generate_loan_number, is_emi_due, next_emi_date,
    next_monthly_run,
};
pub use types::{
    EmploymentStatus, LoanApplication, LoanStatus, LoanType, validate_rejection_reason,
    validate_terms,
};
