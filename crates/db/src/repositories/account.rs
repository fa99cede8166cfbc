//! Account repository: opening, lookups and admin status changes.
//!
//! Balances are only ever written through `posting::post_entry`.

use chrono::Utc;
use corebank_core::account::{
    self as rules, AccountStatus as DomainStatus, AccountType as DomainType, OpenAccountInput,
};
use corebank_core::audit::{AuditAction, AuditEntry, AuditTarget, RequestMeta};
use corebank_core::auth::Actor;
use corebank_core::ledger::{Direction, TransactionType};
use corebank_shared::types::{AccountId, PageRequest, PageResponse};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::audit::AuditRepository;
use super::error::{RepoResult, RepositoryError};
use super::posting::{Posting, lock_account, post_entry, unused_account_number};
use crate::entities::{
    accounts,
    sea_orm_active_enums::{AccountStatus, AccountType},
    transactions, users,
};

/// Filter options for listing accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    /// Owner.
    pub user_id: Option<Uuid>,
    /// Status.
    pub status: Option<DomainStatus>,
    /// Account type.
    pub account_type: Option<DomainType>,
    /// Account number prefix.
    pub account_number: Option<String>,
}

/// Result of opening an account.
#[derive(Debug, Clone, Serialize)]
pub struct OpenedAccount {
    /// The new account.
    pub account: accounts::Model,
    /// The initial deposit, if one was made.
    pub initial_deposit: Option<transactions::Model>,
}

/// Account repository.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
    audit: AuditRepository,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        let audit = AuditRepository::new(db.clone());
        Self { db, audit }
    }

    /// Opens an account for `user_id`.
    ///
    /// The account starts at zero. A non-zero initial deposit is posted as a
    /// `deposit` entry in the same database transaction.
    ///
    /// # Errors
    ///
    /// Returns `Account` errors for invalid terms.
    pub async fn open(&self, user_id: Uuid, input: OpenAccountInput) -> RepoResult<OpenedAccount> {
        let now = Utc::now();
        rules::validate_open(&input, now.date_naive())?;

        let txn = self.db.begin().await?;
        let account_number = unused_account_number(&txn, now).await?;

        let account = accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            account_number: Set(account_number),
            user_id: Set(user_id),
            account_type: Set(input.account_type.into()),
            balance: Set(Decimal::ZERO),
            status: Set(AccountStatus::Active),
            currency: Set(input.currency.code().to_string()),
            interest_rate: Set(input.interest_rate),
            maturity_date: Set(input.maturity_date),
            opened_at: Set(now.into()),
            last_transaction_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        let (account, initial_deposit) = if input.initial_deposit.is_zero() {
            (account, None)
        } else {
            let posting = Posting::new(
                now,
                TransactionType::Deposit,
                Direction::Credit,
                input.initial_deposit,
                "Initial deposit".to_string(),
            );
            let (account, row) = post_entry(&txn, account, posting, now).await?;
            (account, Some(row))
        };

        txn.commit().await?;

        tracing::info!(
            account_id = %account.id,
            account_number = %account.account_number,
            user_id = %user_id,
            account_type = %input.account_type,
            initial_deposit = %input.initial_deposit,
            "Account opened"
        );

        Ok(OpenedAccount {
            account,
            initial_deposit,
        })
    }

    /// Finds an account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<accounts::Model>> {
        Ok(accounts::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Loads an account or fails with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist.
    pub async fn get(&self, id: Uuid) -> RepoResult<accounts::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Account", id))
    }

    /// Loads an account together with its owner.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the account does not exist.
    pub async fn get_with_owner(&self, id: Uuid) -> RepoResult<(accounts::Model, users::Model)> {
        let (account, owner) = accounts::Entity::find_by_id(id)
            .find_also_related(users::Entity)
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Account", id))?;
        let owner = owner.ok_or_else(|| RepositoryError::not_found("User", account.user_id))?;
        Ok((account, owner))
    }

    /// Lists the accounts of one user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_by_user(&self, user_id: Uuid) -> RepoResult<Vec<accounts::Model>> {
        Ok(accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .order_by_asc(accounts::Column::OpenedAt)
            .all(&self.db)
            .await?)
    }

    /// Lists accounts, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        filter: &AccountFilter,
        page: &PageRequest,
    ) -> RepoResult<PageResponse<accounts::Model>> {
        let mut query = accounts::Entity::find();

        if let Some(user_id) = filter.user_id {
            query = query.filter(accounts::Column::UserId.eq(user_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(accounts::Column::Status.eq(AccountStatus::from(status)));
        }
        if let Some(account_type) = filter.account_type {
            query = query.filter(accounts::Column::AccountType.eq(AccountType::from(account_type)));
        }
        if let Some(number) = filter
            .account_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
        {
            query = query.filter(accounts::Column::AccountNumber.starts_with(number));
        }

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(accounts::Column::OpenedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(rows, page, total))
    }

    /// Latest transactions of an account, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn recent_transactions(
        &self,
        account_id: Uuid,
        limit: u64,
    ) -> RepoResult<Vec<transactions::Model>> {
        Ok(transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id))
            .order_by_desc(transactions::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    /// Sets an account's status (admin only).
    ///
    /// Closed accounts cannot change status, closing requires a zero balance,
    /// and setting the current status again is rejected.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-admins and `Account` errors for rejected
    /// transitions.
    pub async fn set_status(
        &self,
        actor: &Actor,
        id: Uuid,
        next: DomainStatus,
        reason: Option<&str>,
        meta: RequestMeta,
    ) -> RepoResult<accounts::Model> {
        actor.ensure_admin()?;

        let txn = self.db.begin().await?;
        let account = lock_account(&txn, id).await?;
        let current: DomainStatus = account.status.into();
        rules::validate_status_change(current, next, account.balance)?;

        let updated = Self::write_status(&txn, account, next).await?;
        txn.commit().await?;

        tracing::info!(account_id = %id, from = %current, to = %next, "Account status changed");

        let action = match next {
            DomainStatus::Closed => AuditAction::AccountClosed,
            DomainStatus::Frozen => AuditAction::AccountFrozen,
            DomainStatus::Active if current == DomainStatus::Frozen => AuditAction::AccountUnfrozen,
            DomainStatus::Active => AuditAction::AccountStatusChanged,
        };
        self.audit_status(actor, action, &updated, current, reason, meta)
            .await;

        Ok(updated)
    }

    /// Toggles between `active` and `frozen` (admin only).
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-admins and `Account::Closed` for closed
    /// accounts.
    pub async fn toggle_freeze(
        &self,
        actor: &Actor,
        id: Uuid,
        reason: Option<&str>,
        meta: RequestMeta,
    ) -> RepoResult<accounts::Model> {
        actor.ensure_admin()?;

        let txn = self.db.begin().await?;
        let account = lock_account(&txn, id).await?;
        let current: DomainStatus = account.status.into();
        let next = rules::toggle_freeze(current)?;

        let updated = Self::write_status(&txn, account, next).await?;
        txn.commit().await?;

        tracing::info!(account_id = %id, from = %current, to = %next, "Account freeze toggled");

        let action = if next == DomainStatus::Frozen {
            AuditAction::AccountFrozen
        } else {
            AuditAction::AccountUnfrozen
        };
        self.audit_status(actor, action, &updated, current, reason, meta)
            .await;

        Ok(updated)
    }

    async fn write_status(
        txn: &sea_orm::DatabaseTransaction,
        account: accounts::Model,
        next: DomainStatus,
    ) -> RepoResult<accounts::Model> {
        let mut active: accounts::ActiveModel = account.into();
        active.status = Set(next.into());
        active.updated_at = Set(Utc::now().into());
        Ok(active.update(txn).await?)
    }

    async fn audit_status(
        &self,
        actor: &Actor,
        action: AuditAction,
        account: &accounts::Model,
        previous: DomainStatus,
        reason: Option<&str>,
        meta: RequestMeta,
    ) {
        let next: DomainStatus = account.status.into();
        let entry = AuditEntry::new(action, AuditTarget::Account, Some(account.id))
            .actor(actor.user_id)
            .details(json!({
                "account_number": account.account_number,
                "owner_id": account.user_id,
            }))
            .reason(reason)
            .states(json!({ "status": previous }), json!({ "status": next }))
            .meta(meta);
        self.audit.record(entry).await;
    }
}
