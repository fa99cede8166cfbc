//! Reversal planning for completed transactions.
//!
//! A reversal never edits or deletes the original row. It marks the original
//! `reversed` and posts a new `reversal` entry with the opposite direction for
//! the same amount. Transfers are reversed leg by leg so both accounts return
//! to their pre-transfer balances; EMI reversals also roll back the loan.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::error::LedgerError;
use super::types::{Direction, TransactionStatus, TransactionType};

/// What a reversal must do, derived from the original entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReversalPlan {
    /// Direction of the compensating `reversal` entry.
    pub direction: Direction,
    /// Amount of the compensating entry (equal to the original).
    pub amount: Decimal,
    /// The counterpart transfer leg must be reversed too.
    pub reverse_counterpart: bool,
    /// The linked loan's counters must be rolled back.
    pub restore_loan: bool,
}

impl ReversalPlan {
    /// Plans the reversal of a transaction.
    ///
    /// # Errors
    ///
    /// - `AlreadyReversed` when the original is already reversed
    /// - `CannotReverseReversal` for `reversal` rows
    /// - `NotReversible` for loan disbursements, which are settled through the loan
    pub fn for_original(
        id: Uuid,
        transaction_type: TransactionType,
        direction: Direction,
        amount: Decimal,
        status: TransactionStatus,
    ) -> Result<Self, LedgerError> {
        if status == TransactionStatus::Reversed {
            return Err(LedgerError::AlreadyReversed(id));
        }
        match transaction_type {
            TransactionType::Reversal => Err(LedgerError::CannotReverseReversal),
            TransactionType::LoanDisbursement => Err(LedgerError::NotReversible(transaction_type)),
            _ => Ok(Self {
                direction: direction.opposite(),
                amount,
                reverse_counterpart: transaction_type.is_transfer(),
                restore_loan: transaction_type == TransactionType::EmiDeduction,
            }),
        }
    }

    /// Description for the compensating entry.
    #[must_use]
    pub fn description(original_reference: &str, reason: &str) -> String {
        format!("Reversal of {original_reference}: {reason}")
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn plan(
        transaction_type: TransactionType,
        direction: Direction,
        status: TransactionStatus,
    ) -> Result<ReversalPlan, LedgerError> {
        ReversalPlan::for_original(Uuid::nil(), transaction_type, direction, dec!(75), status)
    }

    #[test]
    fn test_deposit_reversal_debits() {
        let p = plan(
            TransactionType::Deposit,
            Direction::Credit,
            TransactionStatus::Completed,
        )
        .unwrap();
        assert_eq!(p.direction, Direction::Debit);
        assert_eq!(p.amount, dec!(75));
        assert!(!p.reverse_counterpart);
        assert!(!p.restore_loan);
    }

    #[test]
    fn test_transfer_reverses_counterpart() {
        let p = plan(
            TransactionType::TransferIn,
            Direction::Credit,
            TransactionStatus::Completed,
        )
        .unwrap();
        assert!(p.reverse_counterpart);
        assert_eq!(p.direction, Direction::Debit);
    }

    #[test]
    fn test_emi_reversal_restores_loan() {
        let p = plan(
            TransactionType::EmiDeduction,
            Direction::Debit,
            TransactionStatus::Completed,
        )
        .unwrap();
        assert!(p.restore_loan);
        assert_eq!(p.direction, Direction::Credit);
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            plan(
                TransactionType::Withdrawal,
                Direction::Debit,
                TransactionStatus::Reversed
            ),
            Err(LedgerError::AlreadyReversed(_))
        ));
        assert!(matches!(
            plan(
                TransactionType::Reversal,
                Direction::Credit,
                TransactionStatus::Completed
            ),
            Err(LedgerError::CannotReverseReversal)
        ));
        assert!(matches!(
            plan(
                TransactionType::LoanDisbursement,
                Direction::Credit,
                TransactionStatus::Completed
            ),
            Err(LedgerError::NotReversible(TransactionType::LoanDisbursement))
        ));
    }

    #[test]
    fn test_description() {
        assert_eq!(
            ReversalPlan::description("TXN1", "duplicate posting"),
            "Reversal of TXN1: duplicate posting"
        );
    }
}
