//! EMI calculation and amortization.
//!
//! `EMI = P·R·(1+R)^N / ((1+R)^N − 1)` with `R = annual_rate / 12 / 100`.
//! A zero rate degenerates to `P / N`.

use chrono::{Months, NaiveDate};
use corebank_shared::types::round_money;
use rust_decimal::{Decimal, MathematicalOps};
use serde::Serialize;

use super::error::LoanError;
use super::types::validate_terms;

const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);
const TWELVE_HUNDRED: Decimal = Decimal::from_parts(1200, 0, 0, false, 0);

/// Monthly rate as a fraction (`annual_rate / 12 / 100`).
#[must_use]
pub fn monthly_rate(annual_rate: Decimal) -> Decimal {
    annual_rate / TWELVE_HUNDRED
}

/// Computes the unrounded EMI.
///
/// # Errors
///
/// Returns `LoanError::Overflow` if intermediate values exceed `Decimal`'s range
/// and `LoanError::InvalidTenure` for a zero tenure.
pub fn calculate_emi(
    principal: Decimal,
    annual_rate: Decimal,
    tenure_months: u32,
) -> Result<Decimal, LoanError> {
    if tenure_months == 0 {
        return Err(LoanError::InvalidTenure(0));
    }
    let n = Decimal::from(tenure_months);
    let r = monthly_rate(annual_rate);
    if r.is_zero() {
        return Ok(principal / n);
    }

    let growth = (Decimal::ONE + r)
        .checked_powi(i64::from(tenure_months))
        .ok_or(LoanError::Overflow)?;
    let numerator = principal
        .checked_mul(r)
        .and_then(|v| v.checked_mul(growth))
        .ok_or(LoanError::Overflow)?;
    let denominator = growth - Decimal::ONE;
    numerator.checked_div(denominator).ok_or(LoanError::Overflow)
}

/// Loan totals derived from the terms, all in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoanDetails {
    /// Principal.
    pub principal: Decimal,
    /// Annual interest rate in percent.
    pub interest_rate: Decimal,
    /// Tenure in months.
    pub tenure_months: u32,
    /// Monthly installment.
    pub emi: Decimal,
    /// `emi × tenure_months`.
    pub total_payable: Decimal,
    /// `total_payable − principal`.
    pub total_interest: Decimal,
}

impl LoanDetails {
    /// Validates the terms and computes EMI and totals.
    ///
    /// The EMI is rounded to cents, half away from zero. When rounding down
    /// would leave `emi × tenure` below the principal, the EMI is raised by one
    /// cent so the principal is always fully repaid.
    ///
    /// # Errors
    ///
    /// Returns a `LoanError` for out-of-range terms or arithmetic overflow.
    pub fn calculate(
        principal: Decimal,
        interest_rate: Decimal,
        tenure_months: u32,
    ) -> Result<Self, LoanError> {
        validate_terms(principal, interest_rate, tenure_months)?;

        let n = Decimal::from(tenure_months);
        let mut emi = round_money(calculate_emi(principal, interest_rate, tenure_months)?);
        if emi.checked_mul(n).ok_or(LoanError::Overflow)? < principal {
            emi = emi.checked_add(CENT).ok_or(LoanError::Overflow)?;
        }
        let total_payable = emi.checked_mul(n).ok_or(LoanError::Overflow)?;
        let total_interest = total_payable
            .checked_sub(principal)
            .ok_or(LoanError::Overflow)?;

        Ok(Self {
            principal,
            interest_rate,
            tenure_months,
            emi,
            total_payable,
            total_interest,
        })
    }
}

/// One installment of an amortization schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmortizationRow {
    /// 1-based installment number.
    pub installment: u32,
    /// Due date, when the first due date is known.
    pub due_date: Option<NaiveDate>,
    /// Amount paid.
    pub payment: Decimal,
    /// Principal component.
    pub principal: Decimal,
    /// Interest component.
    pub interest: Decimal,
    /// Principal still owed after this installment.
    pub remaining_principal: Decimal,
}

/// Splits each installment into principal and interest.
///
/// Interest for a month is the remaining principal times the monthly rate,
/// rounded to cents. The final installment clears the remaining principal and
/// carries whatever is left of the EMI as interest, so the principal column
/// always sums to the loan principal.
///
/// # Errors
///
/// Returns `LoanError::Overflow` if a component leaves `Decimal`'s range.
pub fn amortization_schedule(
    details: &LoanDetails,
    first_due: Option<NaiveDate>,
) -> Result<Vec<AmortizationRow>, LoanError> {
    let r = monthly_rate(details.interest_rate);
    let mut remaining = details.principal;
    let mut rows = Vec::with_capacity(details.tenure_months as usize);

    for installment in 1..=details.tenure_months {
        let due_date =
            first_due.and_then(|d| d.checked_add_months(Months::new(installment - 1)));

        let (principal, interest) = if installment == details.tenure_months {
            let interest = details
                .emi
                .checked_sub(remaining)
                .ok_or(LoanError::Overflow)?
                .max(Decimal::ZERO);
            (remaining, interest)
        } else {
            let interest = round_money(remaining.checked_mul(r).ok_or(LoanError::Overflow)?);
            let principal = details
                .emi
                .checked_sub(interest)
                .ok_or(LoanError::Overflow)?
                .clamp(Decimal::ZERO, remaining);
            (principal, interest)
        };
        remaining = remaining.checked_sub(principal).ok_or(LoanError::Overflow)?;

        rows.push(AmortizationRow {
            installment,
            due_date,
            payment: principal.checked_add(interest).ok_or(LoanError::Overflow)?,
            principal,
            interest,
            remaining_principal: remaining,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_decimal_macros::dec;

    use super::*;

    #[rstest]
    #[case(dec!(10000), dec!(12), 12, dec!(888.49))]
    #[case(dec!(100000), dec!(10), 12, dec!(8791.59))]
    #[case(dec!(12000), dec!(0), 12, dec!(1000.00))]
    #[case(dec!(50000), dec!(8.5), 60, dec!(1025.83))]
    fn test_emi_known_values(
        #[case] principal: Decimal,
        #[case] rate: Decimal,
        #[case] tenure: u32,
        #[case] expected: Decimal,
    ) {
        let details = LoanDetails::calculate(principal, rate, tenure).unwrap();
        assert_eq!(details.emi, expected);
        assert_eq!(details.total_payable, expected * Decimal::from(tenure));
    }

    #[test]
    fn test_totals() {
        let details = LoanDetails::calculate(dec!(10000), dec!(12), 12).unwrap();
        assert_eq!(details.total_payable, dec!(10661.88));
        assert_eq!(details.total_interest, dec!(661.88));
    }

    #[test]
    fn test_zero_rate_rounding_never_underpays() {
        // 1001 / 6 = 166.8333.. rounds to 166.83, which would repay 1000.98.
        let details = LoanDetails::calculate(dec!(1001), dec!(0), 6).unwrap();
        assert_eq!(details.emi, dec!(166.84));
        assert!(details.total_payable >= details.principal);
    }

    #[test]
    fn test_zero_tenure_rejected() {
        assert!(calculate_emi(dec!(1000), dec!(5), 0).is_err());
    }

    #[test]
    fn test_largest_principal_calculates() {
        let details = LoanDetails::calculate(dec!(999999999999.99), dec!(30), 360).unwrap();
        assert!(details.total_payable >= details.principal);
        assert_eq!(details.total_interest, details.total_payable - details.principal);

        let rows = amortization_schedule(&details, None).unwrap();
        assert_eq!(rows.len(), 360);
        assert_eq!(rows[359].remaining_principal, Decimal::ZERO);
    }

    #[rstest]
    #[case(Decimal::MAX, dec!(12), 12)]
    #[case(Decimal::MAX, dec!(0), 6)]
    #[case(dec!(79228162514264337593543950.335), dec!(30), 360)]
    #[case(dec!(1000000000000), dec!(1), 360)]
    fn test_oversized_principal_rejected(
        #[case] principal: Decimal,
        #[case] rate: Decimal,
        #[case] tenure: u32,
    ) {
        assert!(matches!(
            LoanDetails::calculate(principal, rate, tenure),
            Err(LoanError::PrincipalTooLarge { .. })
        ));
    }

    #[test]
    fn test_unvalidated_details_overflow() {
        let details = LoanDetails {
            principal: Decimal::MAX,
            interest_rate: Decimal::MAX,
            tenure_months: 2,
            emi: Decimal::MAX,
            total_payable: Decimal::MAX,
            total_interest: Decimal::ZERO,
        };
        assert!(matches!(
            amortization_schedule(&details, None),
            Err(LoanError::Overflow)
        ));
    }

    #[test]
    fn test_schedule_sums() {
        let details = LoanDetails::calculate(dec!(10000), dec!(12), 12).unwrap();
        let first = NaiveDate::from_ymd_opt(2025, 2, 1);
        let rows = amortization_schedule(&details, first).unwrap();

        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0].interest, dec!(100.00));
        assert_eq!(rows[0].principal, dec!(788.49));
        assert_eq!(rows[11].due_date, NaiveDate::from_ymd_opt(2026, 1, 1));
        assert_eq!(rows[11].remaining_principal, Decimal::ZERO);

        let principal: Decimal = rows.iter().map(|r| r.principal).sum();
        assert_eq!(principal, dec!(10000));
        let paid: Decimal = rows.iter().map(|r| r.payment).sum();
        assert!((paid - details.total_payable).abs() <= dec!(0.10));
    }
}
