//! Integration tests for the ledger repository.
//!
//! Run against a migrated PostgreSQL database at `DATABASE_URL`.

mod common;

use corebank_core::account::{AccountError, AccountStatus};
use corebank_core::audit::RequestMeta;
use corebank_core::auth::UserRole;
use corebank_core::ledger::LedgerError;
use corebank_db::entities::sea_orm_active_enums::{EntryDirection, TransactionStatus, TransactionType};
use corebank_db::repositories::{
    AccountRepository, LedgerRepository, PostingRequest, RepositoryError, TransactionFilter,
    TransferRequest,
};
use corebank_shared::types::PageRequest;
use futures::future::join_all;
use rust_decimal_macros::dec;

use common::{actor, admin, balance, connect, create_user, open_account};

#[tokio::test]
async fn test_deposit_and_withdraw_update_balance_and_ledger() {
    let db = connect().await;
    let user = create_user(&db, UserRole::Customer).await;
    let account = open_account(&db, &user, dec!(100)).await;
    let repo = LedgerRepository::new(db.clone());
    let me = actor(&user);

    let posted = repo
        .deposit(
            &me,
            PostingRequest {
                account_id: account.id,
                amount: dec!(50.25),
                description: None,
            },
        )
        .await
        .expect("deposit");
    assert_eq!(posted.account.balance, dec!(150.25));
    assert_eq!(posted.transaction.balance_after, dec!(150.25));
    assert_eq!(posted.transaction.direction, EntryDirection::Credit);
    assert_eq!(posted.transaction.description, "Deposit");

    let posted = repo
        .withdraw(
            &me,
            PostingRequest {
                account_id: account.id,
                amount: dec!(20),
                description: Some("ATM".to_string()),
            },
        )
        .await
        .expect("withdraw");
    assert_eq!(posted.account.balance, dec!(130.25));
    assert_eq!(posted.transaction.transaction_type, TransactionType::Withdrawal);

    assert_eq!(repo.signed_sum(account.id).await.unwrap(), dec!(130.25));
}

#[tokio::test]
async fn test_overdraft_is_rejected_without_side_effects() {
    let db = connect().await;
    let user = create_user(&db, UserRole::Customer).await;
    let account = open_account(&db, &user, dec!(10)).await;
    let repo = LedgerRepository::new(db.clone());

    let err = repo
        .withdraw(
            &actor(&user),
            PostingRequest {
                account_id: account.id,
                amount: dec!(10.01),
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Ledger(LedgerError::InsufficientBalance { .. })
    ));
    assert_eq!(balance(&db, account.id).await, dec!(10));

    let page = repo
        .list(
            &TransactionFilter {
                account_id: Some(account.id),
                ..Default::default()
            },
            &PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.data.len(), 1);
}

#[tokio::test]
async fn test_deposit_into_foreign_account_is_forbidden() {
    let db = connect().await;
    let owner = create_user(&db, UserRole::Customer).await;
    let stranger = create_user(&db, UserRole::Customer).await;
    let account = open_account(&db, &owner, dec!(0)).await;

    let err = LedgerRepository::new(db.clone())
        .deposit(
            &actor(&stranger),
            PostingRequest {
                account_id: account.id,
                amount: dec!(5),
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::App(_)));
}

#[tokio::test]
async fn test_transfer_links_both_legs() {
    let db = connect().await;
    let alice = create_user(&db, UserRole::Customer).await;
    let bob = create_user(&db, UserRole::Customer).await;
    let from = open_account(&db, &alice, dec!(500)).await;
    let to = open_account(&db, &bob, dec!(20)).await;

    let transfer = LedgerRepository::new(db.clone())
        .transfer(
            &actor(&alice),
            TransferRequest {
                from_account_id: from.id,
                to_account_id: to.id,
                amount: dec!(125.50),
                description: None,
            },
        )
        .await
        .expect("transfer");

    assert_eq!(transfer.from_account.balance, dec!(374.50));
    assert_eq!(transfer.to_account.balance, dec!(145.50));
    assert_eq!(transfer.debit.counterpart_transaction_id, Some(transfer.credit.id));
    assert_eq!(transfer.credit.counterpart_transaction_id, Some(transfer.debit.id));
    assert_eq!(transfer.debit.related_account_id, Some(to.id));
    assert_eq!(transfer.credit.related_user_id, Some(alice.id));
    assert_ne!(transfer.debit.reference, transfer.credit.reference);
    assert_eq!(
        transfer.debit.description,
        format!("Transfer to {}", to.account_number)
    );
}

#[tokio::test]
async fn test_transfer_to_frozen_account_fails() {
    let db = connect().await;
    let alice = create_user(&db, UserRole::Customer).await;
    let bob = create_user(&db, UserRole::Customer).await;
    let from = open_account(&db, &alice, dec!(100)).await;
    let to = open_account(&db, &bob, dec!(0)).await;

    AccountRepository::new(db.clone())
        .toggle_freeze(&admin(&db).await, to.id, Some("kyc review"), RequestMeta::default())
        .await
        .expect("freeze");

    let err = LedgerRepository::new(db.clone())
        .transfer(
            &actor(&alice),
            TransferRequest {
                from_account_id: from.id,
                to_account_id: to.id,
                amount: dec!(10),
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Account(AccountError::NotActive(AccountStatus::Frozen))
    ));
    assert_eq!(balance(&db, from.id).await, dec!(100));
}

#[tokio::test]
async fn test_reversing_one_transfer_leg_restores_both_accounts() {
    let db = connect().await;
    let alice = create_user(&db, UserRole::Customer).await;
    let bob = create_user(&db, UserRole::Customer).await;
    let from = open_account(&db, &alice, dec!(300)).await;
    let to = open_account(&db, &bob, dec!(0)).await;
    let repo = LedgerRepository::new(db.clone());

    let transfer = repo
        .transfer(
            &actor(&alice),
            TransferRequest {
                from_account_id: from.id,
                to_account_id: to.id,
                amount: dec!(80),
                description: None,
            },
        )
        .await
        .unwrap();

    let admin = admin(&db).await;
    let reversal = repo
        .reverse(&admin, transfer.credit.id, "sent in error", RequestMeta::default())
        .await
        .expect("reverse");

    assert_eq!(reversal.primary.original.status, TransactionStatus::Reversed);
    assert_eq!(reversal.primary.original.reversed_by, Some(admin.user_id));
    assert_eq!(
        reversal.primary.reversal.original_transaction_id,
        Some(transfer.credit.id)
    );
    assert_eq!(reversal.primary.reversal.direction, EntryDirection::Debit);
    let counterpart = reversal.counterpart.expect("both legs reversed");
    assert_eq!(counterpart.original.id, transfer.debit.id);
    assert_eq!(counterpart.reversal.direction, EntryDirection::Credit);

    assert_eq!(balance(&db, from.id).await, dec!(300));
    assert_eq!(balance(&db, to.id).await, dec!(0));
    assert_eq!(repo.signed_sum(from.id).await.unwrap(), dec!(300));
    assert_eq!(repo.signed_sum(to.id).await.unwrap(), dec!(0));

    let err = repo
        .reverse(&admin, transfer.debit.id, "again", RequestMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Ledger(LedgerError::AlreadyReversed(_))
    ));
}

#[tokio::test]
async fn test_reversal_requires_admin() {
    let db = connect().await;
    let user = create_user(&db, UserRole::Customer).await;
    let account = open_account(&db, &user, dec!(40)).await;
    let repo = LedgerRepository::new(db.clone());

    let page = repo
        .list(
            &TransactionFilter {
                account_id: Some(account.id),
                ..Default::default()
            },
            &PageRequest::default(),
        )
        .await
        .unwrap();
    let deposit = &page.data[0];

    let err = repo
        .reverse(&actor(&user), deposit.id, "mine", RequestMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::App(_)));
    assert_eq!(balance(&db, account.id).await, dec!(40));
}

#[tokio::test]
async fn test_statement_balances_chain() {
    let db = connect().await;
    let user = create_user(&db, UserRole::Customer).await;
    let account = open_account(&db, &user, dec!(200)).await;
    let repo = LedgerRepository::new(db.clone());
    let me = actor(&user);

    repo.withdraw(
        &me,
        PostingRequest {
            account_id: account.id,
            amount: dec!(45),
            description: None,
        },
    )
    .await
    .unwrap();

    let now = chrono::Utc::now();
    let statement = repo
        .statement(account.id, chrono::Datelike::month(&now), chrono::Datelike::year(&now))
        .await
        .unwrap();

    assert_eq!(statement.summary.opening_balance, dec!(0));
    assert_eq!(statement.summary.closing_balance, dec!(155));
    assert_eq!(statement.summary.total_deposits, dec!(200));
    assert_eq!(statement.summary.total_withdrawals, dec!(45));
    assert_eq!(statement.transactions.len(), 2);
}

#[tokio::test]
async fn test_concurrent_opposite_transfers_conserve_money() {
    let db = connect().await;
    let alice = create_user(&db, UserRole::Customer).await;
    let bob = create_user(&db, UserRole::Customer).await;
    let a = open_account(&db, &alice, dec!(1000)).await;
    let b = open_account(&db, &bob, dec!(1000)).await;
    let repo = LedgerRepository::new(db.clone());

    let tasks = (0..20).map(|i| {
        let repo = repo.clone();
        let (who, from, to) = if i % 2 == 0 {
            (actor(&alice), a.id, b.id)
        } else {
            (actor(&bob), b.id, a.id)
        };
        async move {
            repo.transfer(
                &who,
                TransferRequest {
                    from_account_id: from,
                    to_account_id: to,
                    amount: dec!(7),
                    description: None,
                },
            )
            .await
        }
    });

    let results = join_all(tasks).await;
    assert!(results.iter().all(Result::is_ok));

    let total = balance(&db, a.id).await + balance(&db, b.id).await;
    assert_eq!(total, dec!(2000));
    assert_eq!(repo.signed_sum(a.id).await.unwrap(), balance(&db, a.id).await);
}
