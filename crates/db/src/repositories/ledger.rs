//! Ledger repository: deposits, withdrawals, transfers and reversals.
//!
//! Each operation is one database transaction. Account rows are locked with
//! `SELECT ... FOR UPDATE` before any balance is read; when two accounts take
//! part they are locked in ascending id order so concurrent transfers in
//! opposite directions cannot deadlock.

use chrono::{DateTime, Utc};
use corebank_core::account::{self as account_rules, AccountError, AccountStatus};
use corebank_core::audit::{AuditAction, AuditEntry, AuditTarget, RequestMeta};
use corebank_core::auth::Actor;
use corebank_core::ledger::{
    self, Direction, LedgerEntry, LedgerError, Receipt, ReversalPlan, StatementSummary,
    StatementWindow, TransactionType as DomainType,
};
use corebank_core::loan::LoanStatus;
use corebank_shared::types::{PageRequest, PageResponse};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::audit::AuditRepository;
use super::error::{RepoResult, RepositoryError};
use super::posting::{Posting, lock_account, lock_account_pair, post_entry};
use crate::entities::{
    accounts, loans,
    sea_orm_active_enums::{TransactionStatus, TransactionType},
    transactions,
};

/// Deposit or withdrawal request.
#[derive(Debug, Clone)]
pub struct PostingRequest {
    /// Account to post to.
    pub account_id: Uuid,
    /// Amount (at least 1.00, cent precision).
    pub amount: Decimal,
    /// Optional description.
    pub description: Option<String>,
}

/// Transfer request.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Source account, owned by the actor.
    pub from_account_id: Uuid,
    /// Destination account.
    pub to_account_id: Uuid,
    /// Amount (at least 1.00, cent precision).
    pub amount: Decimal,
    /// Optional description.
    pub description: Option<String>,
}

/// A posted entry and the account after posting.
#[derive(Debug, Clone, Serialize)]
pub struct Posted {
    /// The transaction row.
    pub transaction: transactions::Model,
    /// The account after posting.
    pub account: accounts::Model,
}

/// Both legs of a transfer.
#[derive(Debug, Clone, Serialize)]
pub struct Transfer {
    /// `transfer_out` leg on the source account.
    pub debit: transactions::Model,
    /// `transfer_in` leg on the destination account.
    pub credit: transactions::Model,
    /// Source account after posting.
    pub from_account: accounts::Model,
    /// Destination account after posting.
    pub to_account: accounts::Model,
}

/// A reversed original and its compensating entry.
#[derive(Debug, Clone, Serialize)]
pub struct ReversedLeg {
    /// The original, now `reversed`.
    pub original: transactions::Model,
    /// The compensating `reversal` entry.
    pub reversal: transactions::Model,
}

/// Outcome of a reversal.
#[derive(Debug, Clone, Serialize)]
pub struct Reversal {
    /// The transaction that was asked to be reversed.
    pub primary: ReversedLeg,
    /// The other leg, for transfers.
    pub counterpart: Option<ReversedLeg>,
    /// The loan whose counters were rolled back, for EMI deductions.
    pub restored_loan: Option<loans::Model>,
}

/// Filter options for listing transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Account.
    pub account_id: Option<Uuid>,
    /// Account owner.
    pub user_id: Option<Uuid>,
    /// Type.
    pub transaction_type: Option<DomainType>,
    /// Status.
    pub status: Option<ledger::TransactionStatus>,
    /// Created at or after.
    pub from: Option<DateTime<Utc>>,
    /// Created before.
    pub to: Option<DateTime<Utc>>,
    /// Minimum amount.
    pub min_amount: Option<Decimal>,
    /// Maximum amount.
    pub max_amount: Option<Decimal>,
}

/// Monthly statement of an account.
#[derive(Debug, Clone, Serialize)]
pub struct Statement {
    /// The account.
    pub account: accounts::Model,
    /// Covered period.
    pub period: StatementWindow,
    /// Totals.
    pub summary: StatementSummary,
    /// Entries in the period, oldest first.
    pub transactions: Vec<transactions::Model>,
}

/// Ledger repository.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
    audit: AuditRepository,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        let audit = AuditRepository::new(db.clone());
        Self { db, audit }
    }

    /// Credits an account owned by the actor.
    ///
    /// # Errors
    ///
    /// - `Ledger` for invalid amounts or descriptions
    /// - `NotFound` if the account does not exist
    /// - `Forbidden` if the actor does not own the account
    /// - `Account::NotActive` for frozen or closed accounts
    pub async fn deposit(&self, actor: &Actor, request: PostingRequest) -> RepoResult<Posted> {
        self.post_single(actor, request, DomainType::Deposit, Direction::Credit, "Deposit")
            .await
    }

    /// Debits an account owned by the actor.
    ///
    /// # Errors
    ///
    /// As [`Self::deposit`], plus `Ledger::InsufficientBalance`.
    pub async fn withdraw(&self, actor: &Actor, request: PostingRequest) -> RepoResult<Posted> {
        self.post_single(
            actor,
            request,
            DomainType::Withdrawal,
            Direction::Debit,
            "Withdrawal",
        )
        .await
    }

    async fn post_single(
        &self,
        actor: &Actor,
        request: PostingRequest,
        transaction_type: DomainType,
        direction: Direction,
        default_description: &str,
    ) -> RepoResult<Posted> {
        let amount = ledger::validate_amount(request.amount)?;
        let description =
            ledger::validate_description(request.description.as_deref(), default_description)?;
        let now = Utc::now();

        let txn = self.db.begin().await?;
        let account = lock_account(&txn, request.account_id).await?;
        actor.ensure_owner(account.user_id)?;
        account_rules::ensure_can_transact(account.status.into())?;

        let posting = Posting::new(now, transaction_type, direction, amount, description);
        let (account, transaction) = post_entry(&txn, account, posting, now).await?;
        txn.commit().await?;

        tracing::info!(
            account_id = %account.id,
            transaction_id = %transaction.id,
            transaction_type = %transaction_type,
            amount = %amount,
            "Posting completed"
        );

        Ok(Posted {
            transaction,
            account,
        })
    }

    /// Moves money between two accounts.
    ///
    /// Both accounts must be active and the source must belong to the actor.
    /// The debit and credit legs reference each other.
    ///
    /// # Errors
    ///
    /// - `Ledger::SameAccount` when both sides are the same account
    /// - `Ledger::InsufficientBalance` when the source cannot cover the amount
    /// - `Forbidden` if the actor does not own the source
    /// - `Account::NotActive` if either account is not active
    pub async fn transfer(&self, actor: &Actor, request: TransferRequest) -> RepoResult<Transfer> {
        if request.from_account_id == request.to_account_id {
            return Err(LedgerError::SameAccount.into());
        }
        let amount = ledger::validate_amount(request.amount)?;
        let now = Utc::now();

        let txn = self.db.begin().await?;
        let (from, to) =
            lock_account_pair(&txn, request.from_account_id, request.to_account_id).await?;
        actor.ensure_owner(from.user_id)?;
        account_rules::ensure_can_transact(from.status.into())?;
        account_rules::ensure_can_transact(to.status.into())?;
        ledger::plan_transfer((from.id, from.balance), (to.id, to.balance), amount)?;

        let out_description = ledger::validate_description(
            request.description.as_deref(),
            format!("Transfer to {}", to.account_number),
        )?;
        let in_description = ledger::validate_description(
            request.description.as_deref(),
            format!("Transfer from {}", from.account_number),
        )?;

        let mut debit = Posting::new(
            now,
            DomainType::TransferOut,
            Direction::Debit,
            amount,
            out_description,
        );
        let mut credit = Posting::new(
            now,
            DomainType::TransferIn,
            Direction::Credit,
            amount,
            in_description,
        );
        while credit.reference == debit.reference {
            credit.reference = ledger::generate_reference(now);
        }
        debit.related_account_id = Some(to.id);
        debit.related_user_id = Some(to.user_id);
        debit.counterpart_transaction_id = Some(credit.id);
        credit.related_account_id = Some(from.id);
        credit.related_user_id = Some(from.user_id);
        credit.counterpart_transaction_id = Some(debit.id);

        let (from_account, debit) = post_entry(&txn, from, debit, now).await?;
        let (to_account, credit) = post_entry(&txn, to, credit, now).await?;
        txn.commit().await?;

        tracing::info!(
            from_account_id = %from_account.id,
            to_account_id = %to_account.id,
            amount = %amount,
            reference = %debit.reference,
            "Transfer completed"
        );

        Ok(Transfer {
            debit,
            credit,
            from_account,
            to_account,
        })
    }

    /// Reverses a completed transaction (admin only).
    ///
    /// The original is marked `reversed` and a `reversal` entry with the
    /// opposite direction is posted. Transfers are reversed on both legs, and
    /// EMI deductions also roll back the loan counters. Frozen accounts can be
    /// reversed; closed accounts cannot.
    ///
    /// # Errors
    ///
    /// - `Forbidden` for non-admins
    /// - `Ledger::AlreadyReversed`, `CannotReverseReversal`, `NotReversible`
    /// - `Ledger::InsufficientBalance` if a debit-side reversal would overdraw
    /// - `Account::Closed` if an affected account is closed
    pub async fn reverse(
        &self,
        actor: &Actor,
        transaction_id: Uuid,
        reason: &str,
        meta: RequestMeta,
    ) -> RepoResult<Reversal> {
        actor.ensure_admin()?;
        let reason = reason.trim();
        let now = Utc::now();

        let txn = self.db.begin().await?;
        let original = lock_transaction(&txn, transaction_id).await?;
        let plan = plan_for(&original)?;

        let counterpart = if plan.reverse_counterpart {
            let counterpart_id = original
                .counterpart_transaction_id
                .ok_or(LedgerError::MissingCounterpart(original.id))?;
            let counterpart = lock_transaction(&txn, counterpart_id).await?;
            let counterpart_plan = plan_for(&counterpart)?;
            Some((counterpart, counterpart_plan))
        } else {
            None
        };

        let (primary, counterpart) = match counterpart {
            None => {
                let account = lock_account(&txn, original.account_id).await?;
                let leg =
                    reverse_leg(&txn, account, original, plan, actor, reason, now).await?;
                (leg, None)
            }
            Some((other, other_plan)) => {
                let (account, other_account) =
                    lock_account_pair(&txn, original.account_id, other.account_id).await?;
                let leg = reverse_leg(&txn, account, original, plan, actor, reason, now).await?;
                let other_leg =
                    reverse_leg(&txn, other_account, other, other_plan, actor, reason, now)
                        .await?;
                (leg, Some(other_leg))
            }
        };

        let restored_loan = if plan.restore_loan {
            Some(restore_loan(&txn, &primary.original, now).await?)
        } else {
            None
        };

        txn.commit().await?;

        tracing::warn!(
            transaction_id = %primary.original.id,
            reversal_id = %primary.reversal.id,
            admin_id = %actor.user_id,
            both_legs = counterpart.is_some(),
            "Transaction reversed"
        );

        let entry = AuditEntry::new(
            AuditAction::TransactionReversed,
            AuditTarget::Transaction,
            Some(primary.original.id),
        )
        .actor(actor.user_id)
        .details(json!({
            "reference": primary.original.reference,
            "amount": primary.original.amount,
            "transaction_type": primary.original.transaction_type,
            "reversal_id": primary.reversal.id,
            "counterpart_reversal_id": counterpart.as_ref().map(|leg| leg.reversal.id),
            "loan_id": restored_loan.as_ref().map(|l| l.id),
        }))
        .reason(Some(reason))
        .states(
            json!({ "status": "completed" }),
            json!({ "status": "reversed" }),
        )
        .meta(meta);
        self.audit.record(entry).await;

        Ok(Reversal {
            primary,
            counterpart,
            restored_loan,
        })
    }

    /// Finds a transaction by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<transactions::Model>> {
        Ok(transactions::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Loads a transaction or fails with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the transaction does not exist.
    pub async fn get(&self, id: Uuid) -> RepoResult<transactions::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Transaction", id))
    }

    /// Lists transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        filter: &TransactionFilter,
        page: &PageRequest,
    ) -> RepoResult<PageResponse<transactions::Model>> {
        let mut query = transactions::Entity::find();

        if let Some(account_id) = filter.account_id {
            query = query.filter(transactions::Column::AccountId.eq(account_id));
        }
        if let Some(user_id) = filter.user_id {
            query = query.filter(transactions::Column::UserId.eq(user_id));
        }
        if let Some(transaction_type) = filter.transaction_type {
            query = query.filter(
                transactions::Column::TransactionType.eq(TransactionType::from(transaction_type)),
            );
        }
        if let Some(status) = filter.status {
            query = query.filter(transactions::Column::Status.eq(TransactionStatus::from(status)));
        }
        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::CreatedAt.lt(to));
        }
        if let Some(min) = filter.min_amount {
            query = query.filter(transactions::Column::Amount.gte(min));
        }
        if let Some(max) = filter.max_amount {
            query = query.filter(transactions::Column::Amount.lte(max));
        }

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(rows, page, total))
    }

    /// Builds the monthly statement of an account.
    ///
    /// The opening balance is the signed sum of every entry before the month.
    ///
    /// # Errors
    ///
    /// Returns `Ledger::InvalidStatementPeriod` for bad periods and `NotFound`
    /// for unknown accounts.
    pub async fn statement(&self, account_id: Uuid, month: u32, year: i32) -> RepoResult<Statement> {
        let period = ledger::statement_window(month, year)?;
        let account = accounts::Entity::find_by_id(account_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Account", account_id))?;

        let opening = self.signed_sum_before(account_id, Some(period.start)).await?;
        let rows = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account_id))
            .filter(transactions::Column::CreatedAt.gte(period.start))
            .filter(transactions::Column::CreatedAt.lt(period.end))
            .order_by_asc(transactions::Column::CreatedAt)
            .order_by_asc(transactions::Column::Id)
            .all(&self.db)
            .await?;

        let entries: Vec<LedgerEntry> = rows.iter().map(LedgerEntry::from).collect();
        let summary = StatementSummary::from_entries(opening, &entries);

        Ok(Statement {
            account,
            period,
            summary,
            transactions: rows,
        })
    }

    /// Signed sum of every entry of an account (credits minus debits).
    ///
    /// Equals the account balance when the ledger reconciles.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn signed_sum(&self, account_id: Uuid) -> RepoResult<Decimal> {
        self.signed_sum_before(account_id, None).await
    }

    async fn signed_sum_before(
        &self,
        account_id: Uuid,
        before: Option<DateTime<Utc>>,
    ) -> RepoResult<Decimal> {
        let mut query = transactions::Entity::find()
            .select_only()
            .column_as(
                Expr::cust(
                    "COALESCE(SUM(CASE WHEN direction = 'credit' THEN amount ELSE -amount END), 0)",
                ),
                "signed_sum",
            )
            .filter(transactions::Column::AccountId.eq(account_id));
        if let Some(before) = before {
            query = query.filter(transactions::Column::CreatedAt.lt(before));
        }

        let sum: Option<Decimal> = query.into_tuple().one(&self.db).await?;
        Ok(sum.unwrap_or_default())
    }

    /// Builds a receipt for a transaction.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown transactions.
    pub async fn receipt(&self, id: Uuid) -> RepoResult<(Receipt, transactions::Model)> {
        let row = self.get(id).await?;
        let (account, owner) = accounts::Entity::find_by_id(row.account_id)
            .find_also_related(crate::entities::users::Entity)
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Account", row.account_id))?;

        let related_account_number = match row.related_account_id {
            Some(related_id) => accounts::Entity::find_by_id(related_id)
                .one(&self.db)
                .await?
                .map(|a| a.account_number),
            None => None,
        };

        let receipt = Receipt::from_entry(
            &LedgerEntry::from(&row),
            account.account_number,
            owner.map(|u| u.full_name).unwrap_or_default(),
            related_account_number,
            Utc::now(),
        );
        Ok((receipt, row))
    }
}

async fn lock_transaction(
    txn: &DatabaseTransaction,
    id: Uuid,
) -> RepoResult<transactions::Model> {
    transactions::Entity::find_by_id(id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Transaction", id))
}

fn plan_for(row: &transactions::Model) -> Result<ReversalPlan, LedgerError> {
    ReversalPlan::for_original(
        row.id,
        row.transaction_type.into(),
        row.direction.into(),
        row.amount,
        row.status.into(),
    )
}

/// Posts the compensating entry for one leg and marks the original reversed.
async fn reverse_leg(
    txn: &DatabaseTransaction,
    account: accounts::Model,
    original: transactions::Model,
    plan: ReversalPlan,
    actor: &Actor,
    reason: &str,
    now: DateTime<Utc>,
) -> RepoResult<ReversedLeg> {
    if AccountStatus::from(account.status) == AccountStatus::Closed {
        return Err(AccountError::Closed.into());
    }

    let mut posting = Posting::new(
        now,
        DomainType::Reversal,
        plan.direction,
        plan.amount,
        ReversalPlan::description(&original.reference, reason),
    );
    posting.original_transaction_id = Some(original.id);
    posting.related_account_id = original.related_account_id;
    posting.related_user_id = original.related_user_id;
    posting.loan_id = original.loan_id;

    let (_, reversal) = post_entry(txn, account, posting, now).await?;

    let mut active: transactions::ActiveModel = original.into();
    active.status = Set(TransactionStatus::Reversed);
    active.reversed_by = Set(Some(actor.user_id));
    active.reversed_at = Set(Some(now.into()));
    active.reversal_reason = Set(Some(reason.to_string()));
    let original = active.update(txn).await?;

    Ok(ReversedLeg { original, reversal })
}

/// Rolls back the loan counters after an EMI deduction is reversed.
async fn restore_loan(
    txn: &DatabaseTransaction,
    emi: &transactions::Model,
    now: DateTime<Utc>,
) -> RepoResult<loans::Model> {
    let loan_id = emi
        .loan_id
        .ok_or_else(|| RepositoryError::not_found("Loan for transaction", emi.id))?;
    let loan = loans::Entity::find_by_id(loan_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Loan", loan_id))?;

    let progress = loan.progress().revert_installment(emi.amount, now.date_naive())?;
    let remaining = i32::try_from(progress.remaining_emis)
        .map_err(|_| RepositoryError::Conflict("Remaining EMI count out of range".to_string()))?;

    let mut active: loans::ActiveModel = loan.into();
    active.outstanding_balance = Set(progress.outstanding);
    active.paid_amount = Set(progress.paid);
    active.remaining_emis = Set(remaining);
    active.status = Set(progress.status.into());
    active.next_emi_date = Set(progress.next_emi_date);
    active.updated_at = Set(now.into());
    let loan = active.update(txn).await?;

    tracing::info!(
        loan_id = %loan.id,
        outstanding = %loan.outstanding_balance,
        status = %LoanStatus::from(loan.status),
        "Loan restored after EMI reversal"
    );
    Ok(loan)
}
