//! Installment bookkeeping and EMI dates.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::error::LoanError;
use super::types::LoanStatus;
use crate::numbering::{random_digits, trailing_digits};

/// Repayment counters of a disbursed loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoanProgress {
    /// Monthly installment.
    pub emi: Decimal,
    /// Amount still owed.
    pub outstanding: Decimal,
    /// Amount repaid so far.
    pub paid: Decimal,
    /// Installments left.
    pub remaining_emis: u32,
    /// Status.
    pub status: LoanStatus,
    /// Date the next EMI falls due.
    pub next_emi_date: Option<NaiveDate>,
}

/// Result of collecting one installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Installment {
    /// Amount debited from the account.
    pub amount: Decimal,
    /// Loan counters after the installment.
    pub progress: LoanProgress,
}

impl LoanProgress {
    /// Collects one installment.
    ///
    /// The amount is `min(emi, outstanding)`, and the final installment takes the
    /// exact outstanding balance. After the last installment the loan is `paid`
    /// with no next date; otherwise it is `active` (an overdue loan returns to
    /// active) and the next date moves one month on.
    ///
    /// # Errors
    ///
    /// Returns `LoanError::NotRepayable` for loans that are not active or overdue.
    pub fn apply_installment(&self) -> Result<Installment, LoanError> {
        if !self.status.is_repayable() || self.remaining_emis == 0 {
            return Err(LoanError::NotRepayable(self.status));
        }

        let amount = if self.remaining_emis == 1 {
            self.outstanding
        } else {
            self.emi.min(self.outstanding)
        };
        let outstanding = self.outstanding - amount;
        let remaining_emis = self.remaining_emis - 1;

        let progress = if remaining_emis == 0 || outstanding.is_zero() {
            Self {
                outstanding: Decimal::ZERO,
                paid: self.paid + amount,
                remaining_emis: 0,
                status: self.status.transition_to(LoanStatus::Paid)?,
                next_emi_date: None,
                ..*self
            }
        } else {
            let next = match self.next_emi_date {
                Some(current) => Some(next_emi_date(current)?),
                None => None,
            };
            Self {
                outstanding,
                paid: self.paid + amount,
                remaining_emis,
                status: LoanStatus::Active,
                next_emi_date: next,
                ..*self
            }
        };

        Ok(Installment { amount, progress })
    }

    /// Marks the loan overdue after a failed collection. Overdue stays overdue.
    ///
    /// # Errors
    ///
    /// Returns `LoanError::NotRepayable` for loans that are not active or overdue.
    pub fn mark_overdue(&self) -> Result<Self, LoanError> {
        match self.status {
            LoanStatus::Active | LoanStatus::Overdue => Ok(Self {
                status: LoanStatus::Overdue,
                ..*self
            }),
            other => Err(LoanError::NotRepayable(other)),
        }
    }

    /// Rolls back a collected installment of `amount` (EMI reversal).
    ///
    /// A paid loan becomes active again and gets a next EMI date on the 1st of
    /// the month after `today`. Overdue loans stay overdue.
    ///
    /// # Errors
    ///
    /// Returns `LoanError::NotRepayable` for requested or rejected loans.
    pub fn revert_installment(&self, amount: Decimal, today: NaiveDate) -> Result<Self, LoanError> {
        let status = match self.status {
            LoanStatus::Paid | LoanStatus::Active => LoanStatus::Active,
            LoanStatus::Overdue => LoanStatus::Overdue,
            other => return Err(LoanError::NotRepayable(other)),
        };
        let next_emi_date = match self.next_emi_date {
            Some(date) => Some(date),
            None => Some(first_emi_date(today)?),
        };

        Ok(Self {
            outstanding: self.outstanding + amount,
            paid: (self.paid - amount).max(Decimal::ZERO),
            remaining_emis: self.remaining_emis + 1,
            status,
            next_emi_date,
            ..*self
        })
    }
}

/// First EMI date: the 1st of the month after approval.
///
/// # Errors
///
/// Returns `LoanError::DateOutOfRange` past chrono's calendar range.
pub fn first_emi_date(approved_on: NaiveDate) -> Result<NaiveDate, LoanError> {
    approved_on
        .with_day(1)
        .and_then(|d| d.checked_add_months(Months::new(1)))
        .ok_or(LoanError::DateOutOfRange)
}

/// The EMI date one month after `current`.
///
/// # Errors
///
/// Returns `LoanError::DateOutOfRange` past chrono's calendar range.
pub fn next_emi_date(current: NaiveDate) -> Result<NaiveDate, LoanError> {
    current
        .checked_add_months(Months::new(1))
        .ok_or(LoanError::DateOutOfRange)
}

/// True when an EMI should be collected on `today`.
#[must_use]
pub fn is_emi_due(status: LoanStatus, next_emi_date: Option<NaiveDate>, today: NaiveDate) -> bool {
    status.is_repayable() && next_emi_date.is_some_and(|next| today >= next)
}

/// Next run of the monthly EMI job: the 1st of a month at `hour`:00 UTC,
/// strictly after `now`.
///
/// # Errors
///
/// Returns `LoanError::DateOutOfRange` for hours above 23 or dates past
/// chrono's calendar range.
pub fn next_monthly_run(now: DateTime<Utc>, hour: u32) -> Result<DateTime<Utc>, LoanError> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0).ok_or(LoanError::DateOutOfRange)?;
    let this_month = now
        .date_naive()
        .with_day(1)
        .ok_or(LoanError::DateOutOfRange)?;

    let candidate = Utc.from_utc_datetime(&this_month.and_time(time));
    if candidate > now {
        return Ok(candidate);
    }
    let next_month = first_emi_date(this_month)?;
    Ok(Utc.from_utc_datetime(&next_month.and_time(time)))
}

/// Generates a loan number: `LOAN`, the last 10 digits of the millisecond
/// timestamp, then 3 random digits.
#[must_use]
pub fn generate_loan_number(now: DateTime<Utc>) -> String {
    format!(
        "LOAN{}{}",
        trailing_digits(now.timestamp_millis(), 10),
        random_digits(3)
    )
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn progress(remaining: u32, outstanding: Decimal) -> LoanProgress {
        LoanProgress {
            emi: dec!(888.49),
            outstanding,
            paid: Decimal::ZERO,
            remaining_emis: remaining,
            status: LoanStatus::Active,
            next_emi_date: Some(date(2025, 2, 1)),
        }
    }

    #[test]
    fn test_regular_installment() {
        let step = progress(12, dec!(10661.88)).apply_installment().unwrap();

        assert_eq!(step.amount, dec!(888.49));
        assert_eq!(step.progress.outstanding, dec!(9773.39));
        assert_eq!(step.progress.paid, dec!(888.49));
        assert_eq!(step.progress.remaining_emis, 11);
        assert_eq!(step.progress.status, LoanStatus::Active);
        assert_eq!(step.progress.next_emi_date, Some(date(2025, 3, 1)));
    }

    #[test]
    fn test_final_installment_takes_exact_outstanding() {
        let step = progress(1, dec!(888.47)).apply_installment().unwrap();

        assert_eq!(step.amount, dec!(888.47));
        assert_eq!(step.progress.outstanding, Decimal::ZERO);
        assert_eq!(step.progress.status, LoanStatus::Paid);
        assert_eq!(step.progress.next_emi_date, None);
    }

    #[test]
    fn test_full_repayment_reaches_zero() {
        let mut p = progress(12, dec!(10661.88));
        let mut total = Decimal::ZERO;
        while p.status != LoanStatus::Paid {
            let step = p.apply_installment().unwrap();
            assert!(step.progress.outstanding < p.outstanding);
            total += step.amount;
            p = step.progress;
        }
        assert_eq!(total, dec!(10661.88));
        assert_eq!(p.remaining_emis, 0);
        assert!(p.apply_installment().is_err());
    }

    #[test]
    fn test_overdue_returns_to_active_after_payment() {
        let p = progress(6, dec!(5330.94)).mark_overdue().unwrap();
        assert_eq!(p.status, LoanStatus::Overdue);

        let step = p.apply_installment().unwrap();
        assert_eq!(step.progress.status, LoanStatus::Active);
    }

    #[test]
    fn test_revert_installment_reopens_paid_loan() {
        let paid = progress(1, dec!(888.49)).apply_installment().unwrap().progress;
        let reopened = paid.revert_installment(dec!(888.49), date(2025, 6, 10)).unwrap();

        assert_eq!(reopened.status, LoanStatus::Active);
        assert_eq!(reopened.outstanding, dec!(888.49));
        assert_eq!(reopened.paid, Decimal::ZERO);
        assert_eq!(reopened.remaining_emis, 1);
        assert_eq!(reopened.next_emi_date, Some(date(2025, 7, 1)));
    }

    #[test]
    fn test_emi_dates() {
        assert_eq!(first_emi_date(date(2025, 1, 31)).unwrap(), date(2025, 2, 1));
        assert_eq!(first_emi_date(date(2025, 12, 15)).unwrap(), date(2026, 1, 1));
        assert_eq!(next_emi_date(date(2025, 2, 1)).unwrap(), date(2025, 3, 1));
    }

    #[test]
    fn test_is_emi_due() {
        let next = Some(date(2025, 3, 1));
        assert!(is_emi_due(LoanStatus::Active, next, date(2025, 3, 1)));
        assert!(is_emi_due(LoanStatus::Overdue, next, date(2025, 4, 1)));
        assert!(!is_emi_due(LoanStatus::Active, next, date(2025, 2, 28)));
        assert!(!is_emi_due(LoanStatus::Paid, next, date(2025, 3, 1)));
        assert!(!is_emi_due(LoanStatus::Active, None, date(2025, 3, 1)));
    }

    #[test]
    fn test_next_monthly_run() {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 10, 0, 0).unwrap();
        assert_eq!(
            next_monthly_run(now, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap()
        );

        let early = Utc.with_ymd_and_hms(2025, 3, 1, 0, 30, 0).unwrap();
        assert_eq!(
            next_monthly_run(early, 2).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 1, 2, 0, 0).unwrap()
        );

        let exactly = Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap();
        assert_eq!(
            next_monthly_run(exactly, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
        );

        assert!(next_monthly_run(now, 24).is_err());
    }

    #[test]
    fn test_loan_number_format() {
        let now = DateTime::from_timestamp_millis(1_736_000_123_456).unwrap();
        let number = generate_loan_number(now);
        assert!(number.starts_with("LOAN6000123456"));
        assert_eq!(number.len(), 4 + 10 + 3);
    }
}
