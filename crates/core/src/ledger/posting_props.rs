//! Property-based tests for posting rules.
//!
//! Balances never go negative, transfers conserve money, and the signed sum
//! of accepted entries always equals the running balance.

use proptest::prelude::*;
use corebank_shared::types::money::{MAX_BALANCE, MAX_MONEY};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::posting::{apply, plan_transfer, reconcile, validate_amount};
use super::types::Direction;

/// Strategy to generate a valid amount (1.00 to 1,000,000.00).
fn amount() -> impl Strategy<Value = Decimal> {
    (100i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a non-negative balance.
fn balance() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy spanning the whole positive `Decimal` range, at any scale.
fn any_amount() -> impl Strategy<Value = Decimal> {
    (any::<u32>(), any::<u32>(), any::<u32>(), 0u32..=28)
        .prop_map(|(lo, mid, hi, scale)| Decimal::from_parts(lo, mid, hi, false, scale))
}

/// Strategy spanning balances up to the account limit.
fn any_balance() -> impl Strategy<Value = Decimal> {
    any_amount().prop_map(|b| b.min(MAX_BALANCE))
}

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Credit), Just(Direction::Debit)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every valid cent amount passes validation unchanged.
    #[test]
    fn prop_cent_amounts_validate(a in amount()) {
        prop_assert_eq!(validate_amount(a).unwrap(), a);
    }

    /// `apply` either yields a non-negative balance or rejects the entry.
    #[test]
    fn prop_apply_never_negative(b in balance(), d in direction(), a in amount()) {
        match apply(b, d, a) {
            Ok(next) => prop_assert!(next >= Decimal::ZERO),
            Err(_) => {
                prop_assert_eq!(d, Direction::Debit);
                prop_assert!(a > b);
            }
        }
    }

    /// Amounts outside 1.00..=MAX_MONEY never pass validation.
    #[test]
    fn prop_validation_bounds(a in any_amount()) {
        if validate_amount(a).is_ok() {
            prop_assert!(a >= Decimal::ONE && a <= MAX_MONEY);
        }
    }

    /// Arbitrarily large entries are rejected, never overflow.
    #[test]
    fn prop_apply_huge_amounts(b in any_balance(), d in direction(), a in any_amount()) {
        if let Ok(next) = apply(b, d, a) {
            prop_assert!(next >= Decimal::ZERO);
            prop_assert!(next <= MAX_BALANCE);
        }
    }

    /// Transfers of arbitrary size stay within the balance limits or fail.
    #[test]
    fn prop_transfer_huge_amounts(from in any_balance(), to in any_balance(), a in any_amount()) {
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
        if let Ok(plan) = plan_transfer((x, from), (y, to), a) {
            prop_assert!(plan.from_balance_after >= Decimal::ZERO);
            prop_assert!(plan.to_balance_after <= MAX_BALANCE);
        }
    }

    /// A transfer moves exactly `amount` from one side to the other.
    #[test]
    fn prop_transfer_conserves(from in balance(), to in balance(), a in amount()) {
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
        if let Ok(plan) = plan_transfer((x, from), (y, to), a) {
            prop_assert_eq!(
                plan.from_balance_after + plan.to_balance_after,
                from + to
            );
            prop_assert_eq!(from - plan.from_balance_after, a);
        } else {
            prop_assert!(a > from);
        }
    }

    /// Replaying accepted entries reconciles to the final balance.
    #[test]
    fn prop_reconcile_matches_running_balance(
        ops in prop::collection::vec((direction(), amount()), 0..40)
    ) {
        let mut running = Decimal::ZERO;
        let mut accepted = Vec::new();
        for (d, a) in ops {
            if let Ok(next) = apply(running, d, a) {
                running = next;
                accepted.push((d, a));
            }
        }
        prop_assert_eq!(reconcile(accepted), running);
    }
}
