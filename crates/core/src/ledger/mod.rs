//! Balance-affecting postings.
//!
//! This module implements the ledger rules:
//! - Amount and description validation
//! - Applying credits and debits to a balance without going negative
//! - Transfer planning between two accounts
//! - Reversal planning for completed transactions
//! - Reconciliation of an account's entries against its balance
//! - Monthly statements and receipts

pub mod error;
pub mod posting;
pub mod reversal;
pub mod statement;
pub mod types;

#[cfg(test)]
mod posting_props;
#[cfg(test)]
mod reversal_props;

pub use error::LedgerError;
pub use posting::{
    TransferPlan, apply, generate_reference, plan_transfer, reconcile, signed_amount,
    validate_amount, validate_description,
};
pub use reversal::ReversalPlan;
pub use statement::{Receipt, StatementSummary, StatementWindow, statement_window};
pub use types::{Direction, LedgerEntry, TransactionStatus, TransactionType};
