//! Background jobs.

pub mod emi_deduction;

pub use emi_deduction::{EmiDeductionJob, EmiJobFailure, EmiJobReport};
