//! Property-based tests for reversals.
//!
//! Reversing any completed, reversible entry restores the balance the
//! account had before that entry, and reversing both transfer legs restores
//! both accounts.

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::posting::{apply, plan_transfer, reconcile};
use super::reversal::ReversalPlan;
use super::types::{Direction, TransactionStatus, TransactionType};

fn amount() -> impl Strategy<Value = Decimal> {
    (100i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn reversible_type() -> impl Strategy<Value = TransactionType> {
    prop_oneof![
        Just(TransactionType::Deposit),
        Just(TransactionType::Withdrawal),
        Just(TransactionType::TransferIn),
        Just(TransactionType::TransferOut),
        Just(TransactionType::EmiDeduction),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Entry followed by its reversal nets to zero.
    #[test]
    fn prop_reversal_nets_to_zero(
        opening in amount(),
        tx_type in reversible_type(),
        a in amount(),
    ) {
        let Some(direction) = tx_type.natural_direction() else {
            return Err(TestCaseError::fail("reversible types have a direction"));
        };
        // Fund the account so the original debit is accepted.
        let funded = opening + a;
        let after = apply(funded, direction, a).unwrap();

        let plan = ReversalPlan::for_original(
            Uuid::nil(), tx_type, direction, a, TransactionStatus::Completed,
        ).unwrap();

        prop_assert_eq!(plan.amount, a);
        prop_assert_eq!(plan.direction, direction.opposite());
        if let Ok(restored) = apply(after, plan.direction, plan.amount) {
            prop_assert_eq!(restored, funded);
            prop_assert_eq!(
                reconcile([(direction, a), (plan.direction, plan.amount)]),
                Decimal::ZERO
            );
        }
    }

    /// Reversing both legs of a transfer restores both balances.
    #[test]
    fn prop_transfer_reversal_restores_both(
        from in amount(),
        to in amount(),
        a in amount(),
    ) {
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
        let from = from + a;
        let plan = plan_transfer((x, from), (y, to), a).unwrap();

        let out = ReversalPlan::for_original(
            Uuid::nil(), TransactionType::TransferOut, Direction::Debit, a,
            TransactionStatus::Completed,
        ).unwrap();
        let inn = ReversalPlan::for_original(
            Uuid::nil(), TransactionType::TransferIn, Direction::Credit, a,
            TransactionStatus::Completed,
        ).unwrap();

        prop_assert!(out.reverse_counterpart && inn.reverse_counterpart);
        // The receiver still holds the credited amount, so the debit succeeds.
        let to_restored = apply(plan.to_balance_after, inn.direction, inn.amount).unwrap();
        let from_restored = apply(plan.from_balance_after, out.direction, out.amount).unwrap();
        prop_assert_eq!(from_restored, from);
        prop_assert_eq!(to_restored, to);
    }

    /// A reversed original can never be reversed again.
    #[test]
    fn prop_reversed_is_final(tx_type in reversible_type(), a in amount()) {
        let direction = tx_type.natural_direction().unwrap_or(Direction::Credit);
        prop_assert!(ReversalPlan::for_original(
            Uuid::nil(), tx_type, direction, a, TransactionStatus::Reversed,
        ).is_err());
    }
}
