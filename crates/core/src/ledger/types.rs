//! Ledger domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

text_enum! {
    /// What caused a balance change.
    TransactionType {
        /// Cash deposit, including the initial deposit on account opening.
        Deposit => "deposit",
        /// Cash withdrawal.
        Withdrawal => "withdrawal",
        /// Incoming leg of a transfer.
        TransferIn => "transfer_in",
        /// Outgoing leg of a transfer.
        TransferOut => "transfer_out",
        /// Loan principal credited on approval.
        LoanDisbursement => "loan_disbursement",
        /// Monthly installment debited for a loan.
        EmiDeduction => "emi_deduction",
        /// Compensating entry for a reversed transaction.
        Reversal => "reversal",
    }
}

text_enum! {
    /// Whether an entry adds to or takes from the balance.
    Direction {
        /// Adds to the balance.
        Credit => "credit",
        /// Takes from the balance.
        Debit => "debit",
    }
}

text_enum! {
    /// Transaction status.
    TransactionStatus {
        /// Posted and in effect.
        Completed => "completed",
        /// Compensated by a later `reversal` entry.
        Reversed => "reversed",
    }
}

impl TransactionType {
    /// Direction implied by the type. `None` for reversals, which take the
    /// opposite of whatever they compensate.
    #[must_use]
    pub const fn natural_direction(&self) -> Option<Direction> {
        match self {
            Self::Deposit | Self::TransferIn | Self::LoanDisbursement => Some(Direction::Credit),
            Self::Withdrawal | Self::TransferOut | Self::EmiDeduction => Some(Direction::Debit),
            Self::Reversal => None,
        }
    }

    /// True for the two transfer legs.
    #[must_use]
    pub const fn is_transfer(&self) -> bool {
        matches!(self, Self::TransferIn | Self::TransferOut)
    }
}

impl Direction {
    /// The compensating direction.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Credit => Self::Debit,
            Self::Debit => Self::Credit,
        }
    }
}

/// A posted transaction as seen by ledger rules.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    /// Transaction ID.
    pub id: Uuid,
    /// Unique reference (`TXN...`).
    pub reference: String,
    /// Account the entry belongs to.
    pub account_id: Uuid,
    /// Type.
    pub transaction_type: TransactionType,
    /// Direction.
    pub direction: Direction,
    /// Always positive.
    pub amount: Decimal,
    /// Account balance right after this entry.
    pub balance_after: Decimal,
    /// Free-text description.
    pub description: String,
    /// Status.
    pub status: TransactionStatus,
    /// Posting time.
    pub created_at: DateTime<Utc>,
}
