//! Account rules: opening, transacting and status changes.

use chrono::{DateTime, NaiveDate, Utc};
use corebank_shared::types::money::{MAX_MONEY, has_cent_precision};
use rust_decimal::Decimal;

use super::error::AccountError;
use super::types::{AccountStatus, AccountType, OpenAccountInput};
use crate::numbering::{random_digits, trailing_digits};

const MAX_INTEREST_RATE: Decimal = Decimal::from_parts(30, 0, 0, false, 0);

/// Validates an account opening request.
///
/// FDR accounts need both an interest rate and a maturity date after `today`.
/// Any account may carry an initial deposit of zero or a valid amount (at least
/// 1.00, cent precision, at most [`MAX_MONEY`]).
pub fn validate_open(input: &OpenAccountInput, today: NaiveDate) -> Result<(), AccountError> {
    let deposit = input.initial_deposit;
    if deposit.is_sign_negative()
        || (!deposit.is_zero() && (deposit < Decimal::ONE || !has_cent_precision(deposit)))
    {
        return Err(AccountError::InvalidInitialDeposit(deposit));
    }
    if deposit > MAX_MONEY {
        return Err(AccountError::InitialDepositTooLarge {
            max: MAX_MONEY,
            actual: deposit,
        });
    }

    if let Some(rate) = input.interest_rate {
        if rate.is_sign_negative() || rate > MAX_INTEREST_RATE {
            return Err(AccountError::InvalidInterestRate(rate));
        }
    }

    if input.account_type == AccountType::Fdr {
        let (Some(_), Some(maturity)) = (input.interest_rate, input.maturity_date) else {
            return Err(AccountError::MissingFdrTerms);
        };
        if maturity <= today {
            return Err(AccountError::MaturityNotInFuture);
        }
    } else if let Some(maturity) = input.maturity_date {
        if maturity <= today {
            return Err(AccountError::MaturityNotInFuture);
        }
    }

    Ok(())
}

/// Only active accounts take part in deposits, withdrawals, transfers and EMIs.
pub fn ensure_can_transact(status: AccountStatus) -> Result<(), AccountError> {
    if status == AccountStatus::Active {
        Ok(())
    } else {
        Err(AccountError::NotActive(status))
    }
}

/// Checks that `balance` covers a debit of `amount`.
pub fn ensure_sufficient_balance(balance: Decimal, amount: Decimal) -> Result<(), AccountError> {
    if balance >= amount {
        Ok(())
    } else {
        Err(AccountError::InsufficientBalance {
            available: balance,
            requested: amount,
        })
    }
}

/// Validates an admin status change from `current` to `next`.
///
/// `closed` is terminal, closing requires an empty account, and setting the
/// same status again is rejected.
pub fn validate_status_change(
    current: AccountStatus,
    next: AccountStatus,
    balance: Decimal,
) -> Result<(), AccountError> {
    if current == AccountStatus::Closed {
        return Err(AccountError::Closed);
    }
    if current == next {
        return Err(AccountError::StatusUnchanged(current));
    }
    if next == AccountStatus::Closed && !balance.is_zero() {
        return Err(AccountError::NonZeroBalance(balance));
    }
    Ok(())
}

/// Returns the status after an admin freeze toggle.
pub fn toggle_freeze(current: AccountStatus) -> Result<AccountStatus, AccountError> {
    match current {
        AccountStatus::Active => Ok(AccountStatus::Frozen),
        AccountStatus::Frozen => Ok(AccountStatus::Active),
        AccountStatus::Closed => Err(AccountError::Closed),
    }
}

/// Generates an account number: `AB`, the last 8 digits of the millisecond
/// timestamp, then 4 random digits.
///
/// Uniqueness is enforced by the database; callers retry on conflict.
#[must_use]
pub fn generate_account_number(now: DateTime<Utc>) -> String {
    format!(
        "AB{}{}",
        trailing_digits(now.timestamp_millis(), 8),
        random_digits(4)
    )
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_decimal_macros::dec;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn fdr(rate: Option<Decimal>, maturity: Option<NaiveDate>) -> OpenAccountInput {
        OpenAccountInput {
            account_type: AccountType::Fdr,
            interest_rate: rate,
            maturity_date: maturity,
            ..OpenAccountInput::savings()
        }
    }

    #[test]
    fn test_open_savings_without_deposit() {
        assert!(validate_open(&OpenAccountInput::savings(), today()).is_ok());
    }

    #[rstest]
    #[case(dec!(0), true)]
    #[case(dec!(1), true)]
    #[case(dec!(250.75), true)]
    #[case(dec!(0.50), false)]
    #[case(dec!(-5), false)]
    #[case(dec!(10.001), false)]
    #[case(dec!(999999999999.99), true)]
    #[case(dec!(1000000000000), false)]
    #[case(Decimal::MAX, false)]
    fn test_initial_deposit(#[case] deposit: Decimal, #[case] ok: bool) {
        let input = OpenAccountInput {
            initial_deposit: deposit,
            ..OpenAccountInput::savings()
        };
        assert_eq!(validate_open(&input, today()).is_ok(), ok);
    }

    #[test]
    fn test_initial_deposit_too_large() {
        let input = OpenAccountInput {
            initial_deposit: Decimal::MAX,
            ..OpenAccountInput::savings()
        };
        assert!(matches!(
            validate_open(&input, today()),
            Err(AccountError::InitialDepositTooLarge { max, .. }) if max == MAX_MONEY
        ));
    }

    #[test]
    fn test_fdr_requires_terms() {
        let maturity = NaiveDate::from_ymd_opt(2026, 6, 15);
        assert!(matches!(
            validate_open(&fdr(None, maturity), today()),
            Err(AccountError::MissingFdrTerms)
        ));
        assert!(matches!(
            validate_open(&fdr(Some(dec!(7.5)), None), today()),
            Err(AccountError::MissingFdrTerms)
        ));
        assert!(validate_open(&fdr(Some(dec!(7.5)), maturity), today()).is_ok());
    }

    #[test]
    fn test_fdr_maturity_must_be_future() {
        let input = fdr(Some(dec!(5)), Some(today()));
        assert!(matches!(
            validate_open(&input, today()),
            Err(AccountError::MaturityNotInFuture)
        ));
    }

    #[rstest]
    #[case(dec!(-0.1))]
    #[case(dec!(30.01))]
    fn test_interest_rate_bounds(#[case] rate: Decimal) {
        let input = fdr(Some(rate), NaiveDate::from_ymd_opt(2030, 1, 1));
        assert!(matches!(
            validate_open(&input, today()),
            Err(AccountError::InvalidInterestRate(_))
        ));
    }

    #[test]
    fn test_only_active_transacts() {
        assert!(ensure_can_transact(AccountStatus::Active).is_ok());
        assert!(ensure_can_transact(AccountStatus::Frozen).is_err());
        assert!(ensure_can_transact(AccountStatus::Closed).is_err());
    }

    #[test]
    fn test_sufficient_balance_is_inclusive() {
        assert!(ensure_sufficient_balance(dec!(100), dec!(100)).is_ok());
        assert!(ensure_sufficient_balance(dec!(99.99), dec!(100)).is_err());
    }

    #[test]
    fn test_status_changes() {
        use AccountStatus::{Active, Closed, Frozen};

        assert!(validate_status_change(Active, Frozen, dec!(10)).is_ok());
        assert!(validate_status_change(Frozen, Closed, dec!(0)).is_ok());
        assert!(matches!(
            validate_status_change(Active, Closed, dec!(10)),
            Err(AccountError::NonZeroBalance(_))
        ));
        assert!(matches!(
            validate_status_change(Closed, Active, dec!(0)),
            Err(AccountError::Closed)
        ));
        assert!(matches!(
            validate_status_change(Frozen, Frozen, dec!(0)),
            Err(AccountError::StatusUnchanged(Frozen))
        ));
    }

    #[test]
    fn test_toggle_freeze() {
        assert_eq!(toggle_freeze(AccountStatus::Active).unwrap(), AccountStatus::Frozen);
        assert_eq!(toggle_freeze(AccountStatus::Frozen).unwrap(), AccountStatus::Active);
        assert!(toggle_freeze(AccountStatus::Closed).is_err());
    }

    #[test]
    fn test_account_number_format() {
        let now = DateTime::from_timestamp_millis(1_736_000_123_456).unwrap();
        let number = generate_account_number(now);

        assert_eq!(number.len(), 14);
        assert!(number.starts_with("AB00123456"));
        assert!(number[2..].chars().all(|c| c.is_ascii_digit()));
    }
}
