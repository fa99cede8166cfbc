//! Money helpers with decimal precision.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Balances, amounts and rates are `rust_decimal::Decimal` everywhere.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of fractional digits kept for stored amounts.
pub const MONEY_SCALE: u32 = 2;

/// Largest single amount accepted from a client: deposits, withdrawals,
/// transfers, initial deposits and loan principals (999,999,999,999.99).
pub const MAX_MONEY: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, MONEY_SCALE);

/// Largest balance an account may hold. Stays below the `NUMERIC(19,2)`
/// column limit (999,999,999,999,999.99).
pub const MAX_BALANCE: Decimal = Decimal::from_parts(1_569_325_055, 23_283_064, 0, false, MONEY_SCALE);

/// Rounds an amount to cents, half away from zero.
///
/// `1.005` becomes `1.01`, `-1.005` becomes `-1.01`.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns true when `amount` has no more than two fractional digits.
#[must_use]
pub fn has_cent_precision(amount: Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE
}

/// Represents a monetary amount with currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount in major units (e.g. dollars), at most two decimal places.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: Currency,
}

/// ISO 4217 currency codes accepted on accounts.
///
/// Every account is opened in USD today; the enum exists so the column is typed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// US Dollar
    #[default]
    Usd,
}

impl Money {
    /// Creates a new Money instance, rounding to cents.
    #[must_use]
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: round_money(amount),
            currency,
        }
    }

    /// Creates a zero amount in the specified currency.
    #[must_use]
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}

impl Currency {
    /// Returns the ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Usd => "USD",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USD" => Ok(Self::Usd),
            _ => Err(format!("Unsupported currency: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;
    use rust_decimal_macros::dec;

    use super::*;

    #[rstest]
    #[case(dec!(1.005), dec!(1.01))]
    #[case(dec!(1.004), dec!(1.00))]
    #[case(dec!(-1.005), dec!(-1.01))]
    #[case(dec!(2.675), dec!(2.68))]
    #[case(dec!(100), dec!(100))]
    fn test_round_money(#[case] input: Decimal, #[case] expected: Decimal) {
        assert_eq!(round_money(input), expected);
    }

    #[rstest]
    #[case(dec!(10), true)]
    #[case(dec!(10.5), true)]
    #[case(dec!(10.55), true)]
    #[case(dec!(10.550), true)]
    #[case(dec!(10.555), false)]
    fn test_has_cent_precision(#[case] input: Decimal, #[case] expected: bool) {
        assert_eq!(has_cent_precision(input), expected);
    }

    #[test]
    fn test_money_limits() {
        assert_eq!(MAX_MONEY, dec!(999999999999.99));
        assert_eq!(MAX_BALANCE, dec!(999999999999999.99));
        assert!(has_cent_precision(MAX_MONEY));
        // NUMERIC(19,2) holds 17 integer digits
        assert!(MAX_BALANCE < dec!(100000000000000000));
    }

    #[test]
    fn test_money_new_rounds() {
        let money = Money::new(dec!(99.999), Currency::Usd);
        assert_eq!(money.amount, dec!(100.00));
        assert_eq!(money.to_string(), "100.00 USD");
    }

    #[test]
    fn test_money_sign_helpers() {
        assert!(Money::zero(Currency::Usd).is_zero());
        assert!(!Money::zero(Currency::Usd).is_negative());
        assert!(Money::new(dec!(-10), Currency::Usd).is_negative());
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!(Currency::from_str("usd").unwrap(), Currency::Usd);
        assert_eq!(Currency::default(), Currency::Usd);
        assert!(Currency::from_str("EUR").is_err());
    }
}
