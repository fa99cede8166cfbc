//! Posting rules: validation, balance application and transfers.

use chrono::{DateTime, Utc};
use corebank_shared::types::money::{MAX_BALANCE, MAX_MONEY, has_cent_precision};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::error::LedgerError;
use super::types::Direction;
use crate::numbering::random_digits;

/// Longest description accepted on a posting.
pub const MAX_DESCRIPTION_LEN: usize = 200;

/// Validates a customer-supplied amount: between 1.00 and [`MAX_MONEY`], with
/// cent precision.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount < Decimal::ONE {
        return Err(LedgerError::AmountTooSmall(amount));
    }
    if amount > MAX_MONEY {
        return Err(LedgerError::AmountTooLarge {
            max: MAX_MONEY,
            actual: amount,
        });
    }
    if !has_cent_precision(amount) {
        return Err(LedgerError::AmountTooPrecise(amount));
    }
    Ok(amount)
}

/// Validates and trims an optional description, falling back to `default`.
pub fn validate_description(
    description: Option<&str>,
    default: impl Into<String>,
) -> Result<String, LedgerError> {
    match description.map(str::trim).filter(|d| !d.is_empty()) {
        Some(text) => {
            let len = text.chars().count();
            if len > MAX_DESCRIPTION_LEN {
                Err(LedgerError::DescriptionTooLong {
                    max: MAX_DESCRIPTION_LEN,
                    actual: len,
                })
            } else {
                Ok(text.to_string())
            }
        }
        None => Ok(default.into()),
    }
}

/// Signed effect of an entry on its account balance.
#[must_use]
pub fn signed_amount(direction: Direction, amount: Decimal) -> Decimal {
    match direction {
        Direction::Credit => amount,
        Direction::Debit => -amount,
    }
}

/// Applies an entry to `balance`, returning the new balance.
///
/// # Errors
///
/// Returns `LedgerError::InsufficientBalance` if the result would be negative
/// and `LedgerError::BalanceLimitExceeded` if it would pass [`MAX_BALANCE`].
pub fn apply(balance: Decimal, direction: Direction, amount: Decimal) -> Result<Decimal, LedgerError> {
    let limit_exceeded = || LedgerError::BalanceLimitExceeded { balance, amount };
    let next = balance
        .checked_add(signed_amount(direction, amount))
        .ok_or_else(limit_exceeded)?;
    if next > MAX_BALANCE {
        return Err(limit_exceeded());
    }
    if next.is_sign_negative() && !next.is_zero() {
        return Err(LedgerError::InsufficientBalance {
            available: balance,
            requested: amount,
        });
    }
    Ok(next)
}

/// Sums the signed amounts of an account's entries.
///
/// Reversed originals and their reversal rows are both included, so the
/// result equals the account balance (accounts open at zero).
pub fn reconcile<I>(entries: I) -> Decimal
where
    I: IntoIterator<Item = (Direction, Decimal)>,
{
    entries
        .into_iter()
        .map(|(direction, amount)| signed_amount(direction, amount))
        .sum()
}

/// Resulting balances of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferPlan {
    /// Source balance after the debit.
    pub from_balance_after: Decimal,
    /// Destination balance after the credit.
    pub to_balance_after: Decimal,
}

/// Plans a transfer of `amount` between two accounts given their balances.
///
/// # Errors
///
/// Returns `LedgerError::SameAccount` when both sides are the same account
/// and `LedgerError::InsufficientBalance` when the source cannot cover it.
pub fn plan_transfer(
    from: (Uuid, Decimal),
    to: (Uuid, Decimal),
    amount: Decimal,
) -> Result<TransferPlan, LedgerError> {
    if from.0 == to.0 {
        return Err(LedgerError::SameAccount);
    }
    Ok(TransferPlan {
        from_balance_after: apply(from.1, Direction::Debit, amount)?,
        to_balance_after: apply(to.1, Direction::Credit, amount)?,
    })
}

/// Generates a transaction reference: `TXN`, the millisecond timestamp, then
/// 5 random digits.
#[must_use]
pub fn generate_reference(now: DateTime<Utc>) -> String {
    format!("TXN{}{}", now.timestamp_millis(), random_digits(5))
}
