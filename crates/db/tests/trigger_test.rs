//! Integration tests for the transaction immutability triggers.
//!
//! The triggers guard the ledger even when a statement bypasses the
//! repositories, so these tests write raw SQL.

mod common;

use corebank_core::audit::RequestMeta;
use corebank_core::auth::UserRole;
use corebank_db::entities::sea_orm_active_enums::TransactionStatus;
use corebank_db::repositories::{LedgerRepository, PostingRequest};
use rust_decimal_macros::dec;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr};
use uuid::Uuid;

use common::{actor, admin, connect, create_user, open_account};

/// Posts a deposit and returns its transaction id.
async fn deposit(db: &DatabaseConnection) -> Uuid {
    let user = create_user(db, UserRole::Customer).await;
    let account = open_account(db, &user, dec!(0)).await;
    LedgerRepository::new(db.clone())
        .deposit(
            &actor(&user),
            PostingRequest {
                account_id: account.id,
                amount: dec!(40),
                description: None,
            },
        )
        .await
        .expect("deposit")
        .transaction
        .id
}

async fn run(db: &DatabaseConnection, sql: String) -> Result<(), DbErr> {
    db.execute_unprepared(&sql).await.map(|_| ())
}

fn assert_rejected(result: Result<(), DbErr>, needle: &str) {
    let err = result.expect_err("trigger should reject the statement");
    let msg = err.to_string().to_lowercase();
    assert!(msg.contains(needle), "unexpected error: {err}");
}

#[tokio::test]
async fn test_completed_transaction_columns_are_immutable() {
    let db = connect().await;
    let id = deposit(&db).await;

    for set in [
        "description = 'rewritten'",
        "amount = 1",
        "reference = 'TXN-REWRITTEN'",
        "status = 'completed'",
    ] {
        assert_rejected(
            run(&db, format!("UPDATE transactions SET {set} WHERE id = '{id}'")).await,
            "append-only",
        );
    }
}

#[tokio::test]
async fn test_reversal_cannot_rewrite_other_columns() {
    let db = connect().await;
    let id = deposit(&db).await;
    let admin = create_user(&db, UserRole::Admin).await;

    assert_rejected(
        run(
            &db,
            format!(
                "UPDATE transactions SET status = 'reversed', reversed_by = '{}', \
                 reversed_at = now(), description = 'hidden' WHERE id = '{id}'",
                admin.id
            ),
        )
        .await,
        "append-only",
    );
}

#[tokio::test]
async fn test_reversed_transaction_is_final() {
    let db = connect().await;
    let id = deposit(&db).await;
    let admin = admin(&db).await;

    let reversal = LedgerRepository::new(db.clone())
        .reverse(&admin, id, "posted twice", RequestMeta::default())
        .await
        .expect("reverse");
    assert_eq!(reversal.primary.original.status, TransactionStatus::Reversed);

    for set in [
        "status = 'completed'",
        "reversed_by = NULL",
        "reversed_at = NULL",
        "reversal_reason = 'edited'",
    ] {
        assert_rejected(
            run(&db, format!("UPDATE transactions SET {set} WHERE id = '{id}'")).await,
            "final",
        );
    }
}

#[tokio::test]
async fn test_transactions_cannot_be_deleted() {
    let db = connect().await;
    let id = deposit(&db).await;

    assert_rejected(
        run(&db, format!("DELETE FROM transactions WHERE id = '{id}'")).await,
        "cannot be deleted",
    );
}
