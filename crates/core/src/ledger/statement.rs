//! Monthly statements and transaction receipts.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::error::LedgerError;
use super::posting::signed_amount;
use super::types::{Direction, LedgerEntry, TransactionStatus, TransactionType};

/// Half-open UTC interval `[start, end)` covering one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatementWindow {
    /// Month (1-12).
    pub month: u32,
    /// Year.
    pub year: i32,
    /// First instant of the month.
    pub start: DateTime<Utc>,
    /// First instant of the following month.
    pub end: DateTime<Utc>,
}

/// Builds the statement window for `month`/`year`.
///
/// # Errors
///
/// Returns `LedgerError::InvalidStatementPeriod` for months outside 1-12 or
/// years outside 2000-2100.
pub fn statement_window(month: u32, year: i32) -> Result<StatementWindow, LedgerError> {
    let invalid = || LedgerError::InvalidStatementPeriod { month, year };
    if !(2000..=2100).contains(&year) {
        return Err(invalid());
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;

    Ok(StatementWindow {
        month,
        year,
        start: first.and_time(chrono::NaiveTime::MIN).and_utc(),
        end: next.and_time(chrono::NaiveTime::MIN).and_utc(),
    })
}

/// Totals for a monthly statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatementSummary {
    /// Balance at the start of the window.
    pub opening_balance: Decimal,
    /// Balance at the end of the window.
    pub closing_balance: Decimal,
    /// Deposits plus loan disbursements.
    pub total_deposits: Decimal,
    /// Withdrawals plus EMI deductions.
    pub total_withdrawals: Decimal,
    /// Incoming transfers.
    pub total_transfers_in: Decimal,
    /// Outgoing transfers.
    pub total_transfers_out: Decimal,
    /// Reversal entries that credited the account.
    pub total_reversal_credits: Decimal,
    /// Reversal entries that debited the account.
    pub total_reversal_debits: Decimal,
    /// Number of entries in the window.
    pub transaction_count: usize,
}

impl StatementSummary {
    /// Summarizes the entries posted inside a window.
    ///
    /// `opening_balance` is the signed sum of every entry before the window.
    pub fn from_entries<'a, I>(opening_balance: Decimal, entries: I) -> Self
    where
        I: IntoIterator<Item = &'a LedgerEntry>,
    {
        let mut summary = Self {
            opening_balance,
            closing_balance: opening_balance,
            ..Self::default()
        };

        for entry in entries {
            summary.transaction_count += 1;
            summary.closing_balance += signed_amount(entry.direction, entry.amount);
            let bucket = match entry.transaction_type {
                TransactionType::Deposit | TransactionType::LoanDisbursement => {
                    &mut summary.total_deposits
                }
                TransactionType::Withdrawal | TransactionType::EmiDeduction => {
                    &mut summary.total_withdrawals
                }
                TransactionType::TransferIn => &mut summary.total_transfers_in,
                TransactionType::TransferOut => &mut summary.total_transfers_out,
                TransactionType::Reversal => match entry.direction {
                    Direction::Credit => &mut summary.total_reversal_credits,
                    Direction::Debit => &mut summary.total_reversal_debits,
                },
            };
            *bucket += entry.amount;
        }

        summary
    }
}

/// Receipt for a single transaction.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    /// Transaction ID.
    pub transaction_id: Uuid,
    /// Reference number.
    pub reference: String,
    /// Account number the entry was posted to.
    pub account_number: String,
    /// Account holder name.
    pub account_holder: String,
    /// Type.
    pub transaction_type: TransactionType,
    /// Direction.
    pub direction: Direction,
    /// Amount.
    pub amount: Decimal,
    /// Balance after posting.
    pub balance_after: Decimal,
    /// Description.
    pub description: String,
    /// Counter-account number for transfers.
    pub related_account_number: Option<String>,
    /// Status.
    pub status: TransactionStatus,
    /// Posting time.
    pub posted_at: DateTime<Utc>,
    /// Time the receipt was produced.
    pub generated_at: DateTime<Utc>,
}

impl Receipt {
    /// Projects a ledger entry into a receipt.
    #[must_use]
    pub fn from_entry(
        entry: &LedgerEntry,
        account_number: String,
        account_holder: String,
        related_account_number: Option<String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id: entry.id,
            reference: entry.reference.clone(),
            account_number,
            account_holder,
            transaction_type: entry.transaction_type,
            direction: entry.direction,
            amount: entry.amount,
            balance_after: entry.balance_after,
            description: entry.description.clone(),
            related_account_number,
            status: entry.status,
            posted_at: entry.created_at,
            generated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_decimal_macros::dec;

    use super::*;

    fn entry(transaction_type: TransactionType, direction: Direction, amount: Decimal) -> LedgerEntry {
        LedgerEntry {
            id: Uuid::new_v4(),
            reference: "TXN1".into(),
            account_id: Uuid::nil(),
            transaction_type,
            direction,
            amount,
            balance_after: Decimal::ZERO,
            description: String::new(),
            status: TransactionStatus::Completed,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_window_bounds() {
        let w = statement_window(2, 2024).unwrap();
        assert_eq!(w.start.to_rfc3339(), "2024-02-01T00:00:00+00:00");
        assert_eq!(w.end.to_rfc3339(), "2024-03-01T00:00:00+00:00");

        let w = statement_window(12, 2024).unwrap();
        assert_eq!(w.end.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[rstest]
    #[case(0, 2024)]
    #[case(13, 2024)]
    #[case(5, 1999)]
    fn test_window_rejects_bad_period(#[case] month: u32, #[case] year: i32) {
        assert!(statement_window(month, year).is_err());
    }

    #[test]
    fn test_summary_buckets() {
        let entries = vec![
            entry(TransactionType::Deposit, Direction::Credit, dec!(1000)),
            entry(TransactionType::LoanDisbursement, Direction::Credit, dec!(5000)),
            entry(TransactionType::Withdrawal, Direction::Debit, dec!(200)),
            entry(TransactionType::EmiDeduction, Direction::Debit, dec!(430.33)),
            entry(TransactionType::TransferIn, Direction::Credit, dec!(50)),
            entry(TransactionType::TransferOut, Direction::Debit, dec!(75)),
            entry(TransactionType::Reversal, Direction::Credit, dec!(200)),
        ];

        let s = StatementSummary::from_entries(dec!(100), &entries);

        assert_eq!(s.total_deposits, dec!(6000));
        assert_eq!(s.total_withdrawals, dec!(630.33));
        assert_eq!(s.total_transfers_in, dec!(50));
        assert_eq!(s.total_transfers_out, dec!(75));
        assert_eq!(s.total_reversal_credits, dec!(200));
        assert_eq!(s.total_reversal_debits, dec!(0));
        assert_eq!(s.transaction_count, 7);
        assert_eq!(s.opening_balance, dec!(100));
        assert_eq!(s.closing_balance, dec!(5644.67));
    }

    #[test]
    fn test_receipt_projection() {
        let e = entry(TransactionType::Deposit, Direction::Credit, dec!(10));
        let r = Receipt::from_entry(&e, "AB1".into(), "Jane".into(), None, Utc::now());
        assert_eq!(r.transaction_id, e.id);
        assert_eq!(r.amount, dec!(10));
        assert_eq!(r.account_number, "AB1");
    }
}
