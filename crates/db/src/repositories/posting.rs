//! Balance postings inside an open database transaction.
//!
//! Every balance change goes through [`post_entry`], which applies the ledger
//! rules to a row locked with `SELECT ... FOR UPDATE`, writes the new balance
//! and appends the transaction row.

use chrono::{DateTime, Utc};
use corebank_core::ledger::{self, Direction, TransactionType};
use corebank_shared::types::TransactionId;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QuerySelect, Set,
};
use uuid::Uuid;

use super::error::{RepoResult, RepositoryError};
use crate::entities::{accounts, sea_orm_active_enums::TransactionStatus, transactions};

/// One entry to post against a locked account.
#[derive(Debug, Clone)]
pub(crate) struct Posting {
    pub id: Uuid,
    pub reference: String,
    pub transaction_type: TransactionType,
    pub direction: Direction,
    pub amount: Decimal,
    pub description: String,
    pub related_account_id: Option<Uuid>,
    pub related_user_id: Option<Uuid>,
    pub counterpart_transaction_id: Option<Uuid>,
    pub loan_id: Option<Uuid>,
    pub original_transaction_id: Option<Uuid>,
}

impl Posting {
    /// A posting with a fresh id and reference and no links.
    pub(crate) fn new(
        now: DateTime<Utc>,
        transaction_type: TransactionType,
        direction: Direction,
        amount: Decimal,
        description: String,
    ) -> Self {
        Self {
            id: TransactionId::new().into_inner(),
            reference: ledger::generate_reference(now),
            transaction_type,
            direction,
            amount,
            description,
            related_account_id: None,
            related_user_id: None,
            counterpart_transaction_id: None,
            loan_id: None,
            original_transaction_id: None,
        }
    }
}

/// Locks an account row for the rest of the transaction.
pub(crate) async fn lock_account(
    txn: &DatabaseTransaction,
    id: Uuid,
) -> RepoResult<accounts::Model> {
    accounts::Entity::find_by_id(id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Account", id))
}

/// Locks two distinct accounts in ascending id order and returns them in the
/// order requested.
pub(crate) async fn lock_account_pair(
    txn: &DatabaseTransaction,
    first: Uuid,
    second: Uuid,
) -> RepoResult<(accounts::Model, accounts::Model)> {
    if first <= second {
        let a = lock_account(txn, first).await?;
        let b = lock_account(txn, second).await?;
        Ok((a, b))
    } else {
        let b = lock_account(txn, second).await?;
        let a = lock_account(txn, first).await?;
        Ok((a, b))
    }
}

/// Applies `posting` to a locked account and appends the transaction row.
///
/// Returns the updated account and the inserted transaction.
pub(crate) async fn post_entry(
    txn: &DatabaseTransaction,
    account: accounts::Model,
    posting: Posting,
    now: DateTime<Utc>,
) -> RepoResult<(accounts::Model, transactions::Model)> {
    let balance_after = ledger::apply(account.balance, posting.direction, posting.amount)?;
    let account_id = account.id;
    let user_id = account.user_id;

    let mut active: accounts::ActiveModel = account.into();
    active.balance = Set(balance_after);
    active.last_transaction_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());
    let account = active.update(txn).await?;

    let row = transactions::ActiveModel {
        id: Set(posting.id),
        reference: Set(posting.reference),
        account_id: Set(account_id),
        user_id: Set(user_id),
        transaction_type: Set(posting.transaction_type.into()),
        direction: Set(posting.direction.into()),
        amount: Set(posting.amount),
        balance_after: Set(balance_after),
        description: Set(posting.description),
        related_account_id: Set(posting.related_account_id),
        related_user_id: Set(posting.related_user_id),
        counterpart_transaction_id: Set(posting.counterpart_transaction_id),
        loan_id: Set(posting.loan_id),
        original_transaction_id: Set(posting.original_transaction_id),
        status: Set(TransactionStatus::Completed),
        reversed_by: Set(None),
        reversed_at: Set(None),
        reversal_reason: Set(None),
        created_at: Set(now.into()),
    }
    .insert(txn)
    .await?;

    tracing::debug!(
        account_id = %account_id,
        transaction_id = %row.id,
        transaction_type = %posting.transaction_type,
        amount = %posting.amount,
        balance_after = %balance_after,
        "Posted ledger entry"
    );

    Ok((account, row))
}

/// Generates a unique account number, retrying on the rare collision.
pub(crate) async fn unused_account_number(
    txn: &DatabaseTransaction,
    now: DateTime<Utc>,
) -> RepoResult<String> {
    for _ in 0..5 {
        let candidate = corebank_core::account::generate_account_number(now);
        let taken = accounts::Entity::find()
            .filter(accounts::Column::AccountNumber.eq(candidate.as_str()))
            .count(txn)
            .await?;
        if taken == 0 {
            return Ok(candidate);
        }
    }
    Err(RepositoryError::Conflict(
        "Could not allocate a unique account number".to_string(),
    ))
}
