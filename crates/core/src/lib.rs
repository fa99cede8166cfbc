//! Core banking rules for Corebank.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here; the `db` crate
//! applies them inside database transactions.
//!
//! # Modules
//!
//! - `auth` - Password hashing, roles and access checks
//! - `account` - Account opening and status rules
//! - `ledger` - Balance postings, transfers, reversals and statements
//! - `loan` - EMI calculation, amortization and installment progress
//! - `analytics` - Aggregation shapes for admin reporting
//! - `audit` - Audit trail entries for privileged actions

#[macro_use]
mod macros;

pub mod account;
pub mod analytics;
pub mod audit;
pub mod auth;
pub mod ledger;
pub mod loan;
mod numbering;
