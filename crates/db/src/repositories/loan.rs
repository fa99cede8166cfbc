//! Loan repository: applications, decisions and EMI collection.

use chrono::{NaiveDate, Utc};
use corebank_core::account as account_rules;
use corebank_core::audit::{AuditAction, AuditEntry, AuditTarget, RequestMeta};
use corebank_core::auth::Actor;
use corebank_core::ledger::{self, Direction, TransactionType};
use corebank_core::loan::{
    self, LoanApplication, LoanDetails, LoanError, LoanProgress, LoanStatus as DomainStatus,
};
use corebank_shared::types::{LoanId, PageRequest, PageResponse};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::audit::AuditRepository;
use super::error::{RepoResult, RepositoryError};
use super::posting::{Posting, lock_account, post_entry};
use crate::entities::{
    accounts, loans,
    sea_orm_active_enums::{LoanStatus, LoanType},
    transactions,
};

/// Filter options for listing loans.
#[derive(Debug, Clone, Default)]
pub struct LoanFilter {
    /// Borrower.
    pub user_id: Option<Uuid>,
    /// Status.
    pub status: Option<DomainStatus>,
    /// Loan product.
    pub loan_type: Option<loan::LoanType>,
}

/// Result of approving a loan.
#[derive(Debug, Clone, Serialize)]
pub struct Disbursement {
    /// The loan, now `active`.
    pub loan: loans::Model,
    /// The `loan_disbursement` credit.
    pub transaction: transactions::Model,
    /// The receiving account after the credit.
    pub account: accounts::Model,
}

/// Result of a collected installment.
#[derive(Debug, Clone, Serialize)]
pub struct EmiPayment {
    /// The loan after the installment.
    pub loan: loans::Model,
    /// The `emi_deduction` debit.
    pub transaction: transactions::Model,
    /// The paying account after the debit.
    pub account: accounts::Model,
}

/// Loan repository.
#[derive(Debug, Clone)]
pub struct LoanRepository {
    db: DatabaseConnection,
    audit: AuditRepository,
}

impl LoanRepository {
    /// Creates a new loan repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        let audit = AuditRepository::new(db.clone());
        Self { db, audit }
    }

    /// Files a loan application in `requested` status.
    ///
    /// The account must belong to the applicant and be active. The outstanding
    /// balance starts at the total payable amount.
    ///
    /// # Errors
    ///
    /// - `Loan` errors for invalid terms
    /// - `Forbidden` if the account belongs to someone else
    /// - `Account::NotActive` for frozen or closed accounts
    pub async fn apply(&self, actor: &Actor, application: LoanApplication) -> RepoResult<loans::Model> {
        application.validate()?;
        let details = LoanDetails::calculate(
            application.principal,
            application.interest_rate,
            application.tenure_months,
        )?;
        let tenure = to_i32(application.tenure_months)?;

        let account = accounts::Entity::find_by_id(application.account_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Account", application.account_id))?;
        actor.ensure_owner(account.user_id)?;
        account_rules::ensure_can_transact(account.status.into())?;

        let now = Utc::now();
        let loan_number = self.unused_loan_number().await?;
        let loan = loans::ActiveModel {
            id: Set(LoanId::new().into_inner()),
            loan_number: Set(loan_number),
            user_id: Set(actor.user_id),
            account_id: Set(account.id),
            loan_type: Set(application.loan_type.into()),
            principal: Set(details.principal),
            interest_rate: Set(details.interest_rate),
            tenure_months: Set(tenure),
            emi_amount: Set(details.emi),
            total_payable: Set(details.total_payable),
            outstanding_balance: Set(details.total_payable),
            paid_amount: Set(Decimal::ZERO),
            remaining_emis: Set(tenure),
            status: Set(LoanStatus::Requested),
            purpose: Set(application.purpose.trim().to_string()),
            employment_status: Set(application.employment_status.into()),
            monthly_income: Set(application.monthly_income),
            next_emi_date: Set(None),
            last_emi_at: Set(None),
            emi_start_date: Set(None),
            decided_by: Set(None),
            decided_at: Set(None),
            rejection_reason: Set(None),
            disbursed_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&self.db)
        .await?;

        tracing::info!(
            loan_id = %loan.id,
            loan_number = %loan.loan_number,
            user_id = %actor.user_id,
            principal = %loan.principal,
            emi = %loan.emi_amount,
            "Loan application created"
        );
        Ok(loan)
    }

    /// Approves a requested loan and credits the principal (admin only).
    ///
    /// The first EMI falls due on the 1st of the following month.
    ///
    /// # Errors
    ///
    /// - `Forbidden` for non-admins
    /// - `Loan::InvalidTransition` unless the loan is `requested`
    /// - `Account::NotActive` if the receiving account cannot transact
    pub async fn approve(
        &self,
        actor: &Actor,
        id: Uuid,
        meta: RequestMeta,
    ) -> RepoResult<Disbursement> {
        actor.ensure_admin()?;
        let now = Utc::now();

        let txn = self.db.begin().await?;
        let loan = lock_loan(&txn, id).await?;
        let current: DomainStatus = loan.status.into();
        let next = current.transition_to(DomainStatus::Active)?;

        let account = lock_account(&txn, loan.account_id).await?;
        account_rules::ensure_can_transact(account.status.into())?;

        let mut posting = Posting::new(
            now,
            TransactionType::LoanDisbursement,
            Direction::Credit,
            loan.principal,
            format!("Loan disbursement - {}", loan.loan_number),
        );
        posting.loan_id = Some(loan.id);
        let (account, transaction) = post_entry(&txn, account, posting, now).await?;

        let first_emi = loan::first_emi_date(now.date_naive())?;
        let mut active: loans::ActiveModel = loan.into();
        active.status = Set(next.into());
        active.decided_by = Set(Some(actor.user_id));
        active.decided_at = Set(Some(now.into()));
        active.disbursed_at = Set(Some(now.into()));
        active.emi_start_date = Set(Some(first_emi));
        active.next_emi_date = Set(Some(first_emi));
        active.updated_at = Set(now.into());
        let loan = active.update(&txn).await?;

        txn.commit().await?;

        tracing::info!(
            loan_id = %loan.id,
            loan_number = %loan.loan_number,
            admin_id = %actor.user_id,
            principal = %loan.principal,
            first_emi = %first_emi,
            "Loan approved and disbursed"
        );

        let entry = AuditEntry::new(AuditAction::LoanApproved, AuditTarget::Loan, Some(loan.id))
            .actor(actor.user_id)
            .details(json!({
                "loan_number": loan.loan_number,
                "principal": loan.principal,
                "account_id": loan.account_id,
                "disbursement_id": transaction.id,
            }))
            .states(json!({ "status": current }), json!({ "status": next }))
            .meta(meta);
        self.audit.record(entry).await;

        Ok(Disbursement {
            loan,
            transaction,
            account,
        })
    }

    /// Rejects a requested loan (admin only).
    ///
    /// # Errors
    ///
    /// - `Forbidden` for non-admins
    /// - `Loan::ReasonTooShort` for reasons under 5 characters
    /// - `Loan::InvalidTransition` unless the loan is `requested`
    pub async fn reject(
        &self,
        actor: &Actor,
        id: Uuid,
        reason: &str,
        meta: RequestMeta,
    ) -> RepoResult<loans::Model> {
        actor.ensure_admin()?;
        loan::validate_rejection_reason(reason)?;
        let reason = reason.trim();
        let now = Utc::now();

        let txn = self.db.begin().await?;
        let loan = lock_loan(&txn, id).await?;
        let current: DomainStatus = loan.status.into();
        let next = current.transition_to(DomainStatus::Rejected)?;

        let mut active: loans::ActiveModel = loan.into();
        active.status = Set(next.into());
        active.decided_by = Set(Some(actor.user_id));
        active.decided_at = Set(Some(now.into()));
        active.rejection_reason = Set(Some(reason.to_string()));
        active.updated_at = Set(now.into());
        let loan = active.update(&txn).await?;
        txn.commit().await?;

        tracing::info!(loan_id = %loan.id, admin_id = %actor.user_id, "Loan rejected");

        let entry = AuditEntry::new(AuditAction::LoanRejected, AuditTarget::Loan, Some(loan.id))
            .actor(actor.user_id)
            .details(json!({
                "loan_number": loan.loan_number,
                "principal": loan.principal,
            }))
            .reason(Some(reason))
            .states(json!({ "status": current }), json!({ "status": next }))
            .meta(meta);
        self.audit.record(entry).await;

        Ok(loan)
    }

    /// Collects one installment from the loan's account.
    ///
    /// `actor` is the paying customer for manual payments and `None` for the
    /// scheduled job. With `require_due` the EMI date must have arrived.
    ///
    /// When the balance cannot cover the installment the loan is marked
    /// `overdue`, that change is committed, and the call still fails with
    /// `Ledger::InsufficientBalance`.
    ///
    /// # Errors
    ///
    /// - `Loan::NotRepayable` unless the loan is `active` or `overdue`
    /// - `Loan::NotDue` when `require_due` is set and the date has not come
    /// - `Forbidden` if `actor` does not own the loan
    /// - `Account::NotActive` if the account cannot transact
    /// - `Ledger::InsufficientBalance` as above
    pub async fn deduct_emi(
        &self,
        loan_id: Uuid,
        actor: Option<&Actor>,
        require_due: bool,
        today: NaiveDate,
    ) -> RepoResult<EmiPayment> {
        let now = Utc::now();

        let txn = self.db.begin().await?;
        let loan = lock_loan(&txn, loan_id).await?;
        if let Some(actor) = actor {
            actor.ensure_owner(loan.user_id)?;
        }

        let progress = loan.progress();
        if !progress.status.is_repayable() {
            return Err(LoanError::NotRepayable(progress.status).into());
        }
        if require_due && !loan::is_emi_due(progress.status, progress.next_emi_date, today) {
            return Err(LoanError::NotDue.into());
        }

        let account = lock_account(&txn, loan.account_id).await?;
        account_rules::ensure_can_transact(account.status.into())?;

        let installment = progress.apply_installment()?;
        if let Err(shortfall) = ledger::apply(account.balance, Direction::Debit, installment.amount)
        {
            let overdue = progress.mark_overdue()?;
            let loan = write_progress(&txn, loan, &overdue, now, false).await?;
            txn.commit().await?;
            tracing::warn!(
                loan_id = %loan.id,
                loan_number = %loan.loan_number,
                balance = %account.balance,
                emi = %installment.amount,
                "Insufficient balance for EMI deduction, loan marked overdue"
            );
            return Err(shortfall.into());
        }

        let mut posting = Posting::new(
            now,
            TransactionType::EmiDeduction,
            Direction::Debit,
            installment.amount,
            format!("EMI deduction - {}", loan.loan_number),
        );
        posting.loan_id = Some(loan.id);
        let (account, transaction) = post_entry(&txn, account, posting, now).await?;
        let loan = write_progress(&txn, loan, &installment.progress, now, true).await?;
        txn.commit().await?;

        tracing::info!(
            loan_id = %loan.id,
            loan_number = %loan.loan_number,
            amount = %installment.amount,
            outstanding = %loan.outstanding_balance,
            remaining_emis = loan.remaining_emis,
            status = %installment.progress.status,
            "EMI deducted"
        );

        Ok(EmiPayment {
            loan,
            transaction,
            account,
        })
    }

    /// Active or overdue loans whose EMI date is on or before `today`,
    /// earliest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn due_loans(&self, today: NaiveDate) -> RepoResult<Vec<loans::Model>> {
        Ok(loans::Entity::find()
            .filter(loans::Column::Status.is_in([LoanStatus::Active, LoanStatus::Overdue]))
            .filter(loans::Column::NextEmiDate.lte(today))
            .order_by_asc(loans::Column::NextEmiDate)
            .order_by_asc(loans::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Finds a loan by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<loans::Model>> {
        Ok(loans::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Loads a loan or fails with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the loan does not exist.
    pub async fn get(&self, id: Uuid) -> RepoResult<loans::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Loan", id))
    }

    /// Lists the loans of one user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_by_user(&self, user_id: Uuid) -> RepoResult<Vec<loans::Model>> {
        Ok(loans::Entity::find()
            .filter(loans::Column::UserId.eq(user_id))
            .order_by_desc(loans::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Lists loans, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        filter: &LoanFilter,
        page: &PageRequest,
    ) -> RepoResult<PageResponse<loans::Model>> {
        let mut query = loans::Entity::find();

        if let Some(user_id) = filter.user_id {
            query = query.filter(loans::Column::UserId.eq(user_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(loans::Column::Status.eq(LoanStatus::from(status)));
        }
        if let Some(loan_type) = filter.loan_type {
            query = query.filter(loans::Column::LoanType.eq(LoanType::from(loan_type)));
        }

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(loans::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(rows, page, total))
    }

    async fn unused_loan_number(&self) -> RepoResult<String> {
        for _ in 0..5 {
            let candidate = loan::generate_loan_number(Utc::now());
            let taken = loans::Entity::find()
                .filter(loans::Column::LoanNumber.eq(candidate.as_str()))
                .count(&self.db)
                .await?;
            if taken == 0 {
                return Ok(candidate);
            }
        }
        Err(RepositoryError::Conflict(
            "Could not allocate a unique loan number".to_string(),
        ))
    }
}

async fn lock_loan(txn: &DatabaseTransaction, id: Uuid) -> RepoResult<loans::Model> {
    loans::Entity::find_by_id(id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Loan", id))
}

async fn write_progress(
    txn: &DatabaseTransaction,
    loan: loans::Model,
    progress: &LoanProgress,
    now: chrono::DateTime<Utc>,
    collected: bool,
) -> RepoResult<loans::Model> {
    let mut active: loans::ActiveModel = loan.into();
    active.outstanding_balance = Set(progress.outstanding);
    active.paid_amount = Set(progress.paid);
    active.remaining_emis = Set(to_i32(progress.remaining_emis)?);
    active.status = Set(progress.status.into());
    active.next_emi_date = Set(progress.next_emi_date);
    if collected {
        active.last_emi_at = Set(Some(now.into()));
    }
    active.updated_at = Set(now.into());
    Ok(active.update(txn).await?)
}

fn to_i32(value: u32) -> RepoResult<i32> {
    i32::try_from(value).map_err(|_| LoanError::InvalidTenure(value).into())
}
