//! Account opening and lifecycle rules.
//!
//! Balances are never written directly; see `ledger` for postings. This module
//! decides whether an account may be opened, may transact, or may change status.

pub mod error;
pub mod rules;
pub mod types;

pub use error::AccountError;
pub use rules::{
    ensure_can_transact, ensure_sufficient_balance, generate_account_number, toggle_freeze,
    validate_open, validate_status_change,
};
pub use types::{AccountStatus, AccountType, OpenAccountInput};
