//! Property-based tests for EMI amortization.
//!
//! For any valid terms: the EMI has cent precision, repaying it `tenure`
//! times clears the loan exactly, outstanding strictly decreases on every
//! installment, and the schedule's principal column sums to the principal.
//! Arbitrary terms up to `Decimal::MAX` either calculate or return an error.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use corebank_shared::types::money::MAX_MONEY;

use super::emi::{LoanDetails, amortization_schedule};
use super::progress::LoanProgress;
use super::types::LoanStatus;

/// Strategy for principals from 1,000.00 to 5,000,000.00.
fn principal() -> impl Strategy<Value = Decimal> {
    (100_000i64..500_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for annual rates from 0.00% to 30.00%.
fn rate() -> impl Strategy<Value = Decimal> {
    (0i64..=3000i64).prop_map(|bp| Decimal::new(bp, 2))
}

fn tenure() -> impl Strategy<Value = u32> {
    6u32..=360u32
}

/// Strategy for principals anywhere up to `Decimal::MAX`, at any scale.
fn any_principal() -> impl Strategy<Value = Decimal> {
    (any::<u32>(), any::<u32>(), any::<u32>(), 0u32..=28)
        .prop_map(|(lo, mid, hi, scale)| Decimal::from_parts(lo, mid, hi, false, scale))
}

/// Strategy for rates anywhere in `0..=Decimal::MAX`.
fn any_rate() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        rate(),
        (any::<u32>(), any::<u32>(), any::<u32>())
            .prop_map(|(lo, mid, hi)| Decimal::from_parts(lo, mid, hi, false, 0)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_totals_are_consistent(p in principal(), r in rate(), n in tenure()) {
        let d = LoanDetails::calculate(p, r, n).unwrap();

        prop_assert!(d.emi.scale() <= 2);
        prop_assert_eq!(d.total_payable, d.emi * Decimal::from(n));
        prop_assert!(d.total_payable >= p);
        prop_assert_eq!(d.total_interest, d.total_payable - p);
    }

    #[test]
    fn prop_repayment_clears_exactly(p in principal(), r in rate(), n in tenure()) {
        let d = LoanDetails::calculate(p, r, n).unwrap();
        let mut progress = LoanProgress {
            emi: d.emi,
            outstanding: d.total_payable,
            paid: Decimal::ZERO,
            remaining_emis: n,
            status: LoanStatus::Active,
            next_emi_date: NaiveDate::from_ymd_opt(2025, 1, 1),
        };

        let mut installments = 0u32;
        while progress.status != LoanStatus::Paid {
            let step = progress.apply_installment().unwrap();
            prop_assert!(step.progress.outstanding < progress.outstanding);
            prop_assert!(step.amount <= d.emi);
            progress = step.progress;
            installments += 1;
        }

        prop_assert_eq!(installments, n);
        prop_assert_eq!(progress.outstanding, Decimal::ZERO);
        prop_assert_eq!(progress.paid, d.total_payable);
    }

    #[test]
    fn prop_schedule_repays_principal(p in principal(), r in rate(), n in tenure()) {
        let d = LoanDetails::calculate(p, r, n).unwrap();
        let rows = amortization_schedule(&d, None).unwrap();

        prop_assert_eq!(rows.len(), n as usize);
        let repaid: Decimal = rows.iter().map(|row| row.principal).sum();
        prop_assert_eq!(repaid, p);
        prop_assert!(rows.iter().all(|row| row.interest >= Decimal::ZERO));
        prop_assert_eq!(rows.last().map(|row| row.remaining_principal), Some(Decimal::ZERO));
    }

    #[test]
    fn prop_huge_terms_never_panic(p in any_principal(), r in any_rate(), n in any::<u32>()) {
        if let Ok(d) = LoanDetails::calculate(p, r, n) {
            prop_assert!(p <= MAX_MONEY);
            prop_assert!(d.total_payable >= p);
            prop_assert!(amortization_schedule(&d, None).is_ok());
        }
    }

    #[test]
    fn prop_oversized_principal_rejected(
        p in any_principal().prop_filter("above max", |p| *p > MAX_MONEY),
        r in rate(),
        n in tenure(),
    ) {
        prop_assert!(LoanDetails::calculate(p, r, n).is_err());
    }
}
