//! Admin back-office routes.
//!
//! Mounted behind both `auth_middleware` and `require_admin`.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, patch, post},
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    extractors::{ApiJson, ApiPath, ApiQuery, ClientMeta, Pagination, ValidatedJson},
    jobs::{EmiDeductionJob, EmiJobReport},
    middleware::AuthUser,
};
use corebank_core::account::{AccountStatus, AccountType};
use corebank_core::analytics::{
    AccountGrowth, AnalyticsOverview, AnalyticsPeriod, LoanStatusBreakdown, MonthlyTrend,
};
use corebank_core::audit::{AuditAction, AuditEntry, AuditTarget, RequestMeta};
use corebank_core::auth::{Actor, UserRole};
use corebank_core::loan::{LoanStatus, LoanType};
use corebank_db::{
    AccountRepository, AnalyticsRepository, AuditRepository, LedgerRepository, LoanRepository,
    SessionRepository, UserRepository,
    entities::{accounts, audit_logs, loans, users},
    repositories::{
        AccountFilter, AuditFilter, LoanFilter, Reversal, UserFilter, UserWithAccounts,
    },
};
use corebank_shared::{AppError, types::PageResponse};

/// Creates the admin routes (requires auth and admin middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/{user_id}/status", patch(set_user_status))
        .route("/admin/users/{user_id}/role", patch(set_user_role))
        .route("/admin/accounts", get(list_accounts))
        .route("/admin/accounts/{account_id}/freeze", patch(toggle_freeze))
        .route("/admin/loans", get(list_loans))
        .route("/admin/transactions/{transaction_id}/reverse", post(reverse_transaction))
        .route("/admin/analytics", get(analytics))
        .route("/admin/audit-logs", get(audit_logs))
        .route("/admin/jobs/emi-deduction", post(run_emi_deduction))
}

/// Query parameters for listing users.
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    /// Matches name, email or phone.
    pub search: Option<String>,
    /// `active` or `inactive`.
    pub status: Option<String>,
    /// Filter by role.
    pub role: Option<UserRole>,
}

/// Query parameters for listing accounts.
#[derive(Debug, Deserialize)]
pub struct ListAccountsQuery {
    /// Filter by status.
    pub status: Option<AccountStatus>,
    /// Filter by type.
    pub account_type: Option<AccountType>,
    /// Account number prefix.
    pub account_number: Option<String>,
    /// Filter by owner.
    pub user_id: Option<Uuid>,
}

/// Query parameters for listing loans.
#[derive(Debug, Deserialize)]
pub struct ListLoansQuery {
    /// Filter by status.
    pub status: Option<LoanStatus>,
    /// Filter by product.
    pub loan_type: Option<LoanType>,
    /// Filter by borrower.
    pub user_id: Option<Uuid>,
}

/// Query parameters for the audit log.
#[derive(Debug, Deserialize)]
pub struct AuditLogQuery {
    /// Filter by action.
    pub action: Option<AuditAction>,
    /// Filter by target kind.
    pub target_type: Option<AuditTarget>,
    /// Filter by target.
    pub target_id: Option<Uuid>,
    /// Filter by acting user.
    pub actor_id: Option<Uuid>,
    /// Created at or after.
    pub start_date: Option<DateTime<Utc>>,
    /// Created before.
    pub end_date: Option<DateTime<Utc>>,
}

/// Query parameters for analytics.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    /// `week`, `month` (default) or `year`.
    #[serde(default)]
    pub period: AnalyticsPeriod,
}

/// Request body for activating or deactivating a user.
#[derive(Debug, Deserialize)]
pub struct UserStatusRequest {
    /// New active flag.
    pub is_active: bool,
    /// Reason recorded in the audit log.
    pub reason: Option<String>,
}

/// Request body for changing a user's role.
#[derive(Debug, Deserialize)]
pub struct UserRoleRequest {
    /// New role.
    pub role: UserRole,
    /// Reason recorded in the audit log.
    pub reason: Option<String>,
}

/// Request body for freezing or unfreezing an account.
#[derive(Debug, Default, Deserialize)]
pub struct FreezeRequest {
    /// Reason recorded in the audit log.
    pub reason: Option<String>,
}

/// Request body for reversing a transaction.
#[derive(Debug, Deserialize, Validate)]
pub struct ReverseRequest {
    /// Reason recorded on the transaction and in the audit log.
    #[validate(length(min = 5, max = 500, message = "Reversal reason must be 5-500 characters"))]
    pub reason: String,
}

/// Trend series shown next to the overview.
#[derive(Debug, Serialize)]
pub struct AnalyticsTrends {
    /// Volume per month for the last 12 months.
    pub monthly: Vec<MonthlyTrend>,
    /// New and cumulative accounts per month.
    pub account_growth: Vec<AccountGrowth>,
    /// Loans per status.
    pub loan_status: Vec<LoanStatusBreakdown>,
}

/// Analytics dashboard.
#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    /// Totals for the requested period.
    pub overview: AnalyticsOverview,
    /// Trend series.
    pub trends: AnalyticsTrends,
}

/// GET /admin/users
async fn list_users(
    State(state): State<AppState>,
    Pagination(page): Pagination,
    ApiQuery(query): ApiQuery<ListUsersQuery>,
) -> ApiResult<Json<PageResponse<UserWithAccounts>>> {
    let is_active = match query.status.as_deref() {
        None | Some("") => None,
        Some("active") => Some(true),
        Some("inactive") => Some(false),
        Some(other) => {
            return Err(ApiError::validation(format!(
                "status must be 'active' or 'inactive', got '{other}'"
            )));
        }
    };

    let filter = UserFilter {
        search: query.search,
        is_active,
        role: query.role,
    };
    let result = UserRepository::new((*state.db).clone())
        .list(&filter, &page)
        .await?;
    Ok(Json(result))
}

/// Rejects admin actions an admin may not take on their own user.
fn ensure_not_self(actor: &Actor, user_id: Uuid, what: &str) -> ApiResult<()> {
    if actor.user_id == user_id {
        return Err(ApiError(AppError::BusinessRule(format!(
            "You cannot change your own {what}"
        ))));
    }
    Ok(())
}

async fn record_user_change(
    state: &AppState,
    actor: &Actor,
    action: AuditAction,
    before: &users::Model,
    after: &users::Model,
    reason: Option<&str>,
    meta: RequestMeta,
) {
    let entry = AuditEntry::new(action, AuditTarget::User, Some(after.id))
        .actor(actor.user_id)
        .details(json!({ "email": after.email }))
        .reason(reason)
        .states(
            json!({ "role": UserRole::from(before.role), "is_active": before.is_active }),
            json!({ "role": UserRole::from(after.role), "is_active": after.is_active }),
        )
        .meta(meta);
    AuditRepository::new((*state.db).clone()).record(entry).await;
}

/// Revokes a deactivated user's sessions. The status change is already
/// committed, so a failure is logged and the request carries on.
async fn revoke_sessions(db: &DatabaseConnection, user_id: Uuid) -> Option<u64> {
    match SessionRepository::new(db.clone())
        .revoke_all_user_sessions(user_id)
        .await
    {
        Ok(revoked) => Some(revoked),
        Err(e) => {
            error!(%user_id, error = %e, "Failed to revoke sessions of deactivated user");
            None
        }
    }
}

/// PATCH /admin/users/{user_id}/status
///
/// Deactivation also revokes every refresh session of the user.
async fn set_user_status(
    State(state): State<AppState>,
    auth: AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UserStatusRequest>,
) -> ApiResult<Json<users::Model>> {
    ensure_not_self(auth.actor(), user_id, "active status")?;

    let (before, after) = UserRepository::new((*state.db).clone())
        .set_active(user_id, payload.is_active)
        .await?;

    let action = if after.is_active {
        AuditAction::UserActivated
    } else {
        let revoked = revoke_sessions(&state.db, user_id).await;
        warn!(%user_id, sessions_revoked = ?revoked, "User deactivated");
        AuditAction::UserDeactivated
    };
    info!(%user_id, is_active = after.is_active, admin_id = %auth.user_id(), "User status changed");

    record_user_change(
        &state,
        auth.actor(),
        action,
        &before,
        &after,
        payload.reason.as_deref(),
        meta,
    )
    .await;
    Ok(Json(after))
}

/// PATCH /admin/users/{user_id}/role
async fn set_user_role(
    State(state): State<AppState>,
    auth: AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UserRoleRequest>,
) -> ApiResult<Json<users::Model>> {
    ensure_not_self(auth.actor(), user_id, "role")?;

    let (before, after) = UserRepository::new((*state.db).clone())
        .set_role(user_id, payload.role)
        .await?;

    info!(%user_id, role = %payload.role, admin_id = %auth.user_id(), "User role changed");

    record_user_change(
        &state,
        auth.actor(),
        AuditAction::UserRoleChanged,
        &before,
        &after,
        payload.reason.as_deref(),
        meta,
    )
    .await;
    Ok(Json(after))
}

/// GET /admin/accounts
async fn list_accounts(
    State(state): State<AppState>,
    Pagination(page): Pagination,
    ApiQuery(query): ApiQuery<ListAccountsQuery>,
) -> ApiResult<Json<PageResponse<accounts::Model>>> {
    let filter = AccountFilter {
        user_id: query.user_id,
        status: query.status,
        account_type: query.account_type,
        account_number: query.account_number,
    };
    let result = AccountRepository::new((*state.db).clone())
        .list(&filter, &page)
        .await?;
    Ok(Json(result))
}

/// PATCH /admin/accounts/{account_id}/freeze - Toggle frozen/active.
async fn toggle_freeze(
    State(state): State<AppState>,
    auth: AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiPath(account_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<FreezeRequest>,
) -> ApiResult<Json<accounts::Model>> {
    let account = AccountRepository::new((*state.db).clone())
        .toggle_freeze(auth.actor(), account_id, payload.reason.as_deref(), meta)
        .await?;
    Ok(Json(account))
}

/// GET /admin/loans
async fn list_loans(
    State(state): State<AppState>,
    Pagination(page): Pagination,
    ApiQuery(query): ApiQuery<ListLoansQuery>,
) -> ApiResult<Json<PageResponse<loans::Model>>> {
    let filter = LoanFilter {
        user_id: query.user_id,
        status: query.status,
        loan_type: query.loan_type,
    };
    let result = LoanRepository::new((*state.db).clone())
        .list(&filter, &page)
        .await?;
    Ok(Json(result))
}

/// POST /admin/transactions/{transaction_id}/reverse
async fn reverse_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiPath(transaction_id): ApiPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<ReverseRequest>,
) -> ApiResult<Json<Reversal>> {
    let reversal = LedgerRepository::new((*state.db).clone())
        .reverse(auth.actor(), transaction_id, &payload.reason, meta)
        .await?;
    Ok(Json(reversal))
}

/// GET /admin/analytics?period=
async fn analytics(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AnalyticsQuery>,
) -> ApiResult<Json<AnalyticsResponse>> {
    let repo = AnalyticsRepository::new((*state.db).clone());
    let now = Utc::now();

    let (overview, monthly, account_growth, loan_status) = tokio::try_join!(
        repo.overview(query.period, now),
        repo.monthly_trends(now),
        repo.account_growth(now),
        repo.loan_breakdown(),
    )?;

    Ok(Json(AnalyticsResponse {
        overview,
        trends: AnalyticsTrends {
            monthly,
            account_growth,
            loan_status,
        },
    }))
}

/// GET /admin/audit-logs
async fn audit_logs(
    State(state): State<AppState>,
    Pagination(page): Pagination,
    ApiQuery(query): ApiQuery<AuditLogQuery>,
) -> ApiResult<Json<PageResponse<audit_logs::Model>>> {
    let filter = AuditFilter {
        actor_id: query.actor_id,
        action: query.action,
        target_type: query.target_type,
        target_id: query.target_id,
        from: query.start_date,
        to: query.end_date,
    };
    let result = AuditRepository::new((*state.db).clone())
        .list(&filter, &page)
        .await?;
    Ok(Json(result))
}

/// POST /admin/jobs/emi-deduction - Run the EMI job now.
async fn run_emi_deduction(
    State(state): State<AppState>,
    auth: AuthUser,
    ClientMeta(meta): ClientMeta,
) -> ApiResult<Json<EmiJobReport>> {
    let job = EmiDeductionJob::new((*state.db).clone());
    let report = job.run_once().await?;
    job.record(Some(auth.user_id()), &report, meta).await;

    info!(admin_id = %auth.user_id(), "EMI deduction triggered manually");
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{app, get, send};

    #[tokio::test]
    async fn test_analytics_requires_authentication() {
        let (status, _) = send(app(), get("/api/v1/admin/analytics?period=week")).await;
        assert_eq!(status, 401);
    }

    #[tokio::test]
    async fn test_session_revocation_failure_is_not_fatal() {
        let db = sea_orm::DatabaseConnection::default();
        assert_eq!(super::revoke_sessions(&db, uuid::Uuid::new_v4()).await, None);
    }

    #[test]
    fn test_ensure_not_self() {
        let me = uuid::Uuid::new_v4();
        let actor = corebank_core::auth::Actor::new(me, corebank_core::auth::UserRole::Admin);

        assert!(super::ensure_not_self(&actor, me, "role").is_err());
        assert!(super::ensure_not_self(&actor, uuid::Uuid::new_v4(), "role").is_ok());
    }
}
