//! Account routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiResult,
    extractors::{ApiJson, ApiPath, ClientMeta},
    middleware::AuthUser,
};
use corebank_core::account::{AccountStatus, OpenAccountInput};
use corebank_db::{
    AccountRepository,
    entities::{accounts, sea_orm_active_enums, transactions},
};

/// Number of entries shown with an account.
const RECENT_TRANSACTIONS: u64 = 10;

/// Creates the account routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(open_account))
        .route("/accounts/{account_id}", get(get_account))
        .route("/accounts/{account_id}/balance", get(get_balance))
        .route("/accounts/{account_id}/status", patch(update_status))
}

/// Request body for an admin status change.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Target status.
    pub status: AccountStatus,
    /// Reason recorded in the audit log.
    pub reason: Option<String>,
}

/// Account owner summary.
#[derive(Debug, Serialize)]
pub struct OwnerSummary {
    /// User ID.
    pub id: Uuid,
    /// Full name.
    pub full_name: String,
    /// Email.
    pub email: String,
}

/// An account with its owner and latest entries.
#[derive(Debug, Serialize)]
pub struct AccountDetailResponse {
    /// The account.
    pub account: accounts::Model,
    /// Owner.
    pub owner: OwnerSummary,
    /// Latest transactions, newest first.
    pub recent_transactions: Vec<transactions::Model>,
}

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Account ID.
    pub account_id: Uuid,
    /// Account number.
    pub account_number: String,
    /// Current balance.
    pub balance: Decimal,
    /// Currency code.
    pub currency: String,
    /// Status.
    pub status: sea_orm_active_enums::AccountStatus,
    /// Last balance change.
    pub last_transaction_at: Option<DateTime<Utc>>,
}

/// POST /accounts - Open an account for the caller.
async fn open_account(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<OpenAccountInput>,
) -> ApiResult<impl IntoResponse> {
    let opened = AccountRepository::new((*state.db).clone())
        .open(auth.user_id(), payload)
        .await?;

    info!(
        account_id = %opened.account.id,
        user_id = %auth.user_id(),
        "Account opened"
    );
    Ok((StatusCode::CREATED, Json(opened)))
}

/// GET /accounts - The caller's accounts.
async fn list_accounts(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<accounts::Model>>> {
    let accounts = AccountRepository::new((*state.db).clone())
        .list_by_user(auth.user_id())
        .await?;
    Ok(Json(accounts))
}

/// GET /accounts/{account_id}
async fn get_account(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(account_id): ApiPath<Uuid>,
) -> ApiResult<Json<AccountDetailResponse>> {
    let repo = AccountRepository::new((*state.db).clone());
    let (account, owner) = repo.get_with_owner(account_id).await?;
    auth.actor().ensure_can_access(account.user_id)?;

    let recent_transactions = repo
        .recent_transactions(account.id, RECENT_TRANSACTIONS)
        .await?;

    Ok(Json(AccountDetailResponse {
        account,
        owner: OwnerSummary {
            id: owner.id,
            full_name: owner.full_name,
            email: owner.email,
        },
        recent_transactions,
    }))
}

/// GET /accounts/{account_id}/balance
async fn get_balance(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(account_id): ApiPath<Uuid>,
) -> ApiResult<Json<BalanceResponse>> {
    let account = AccountRepository::new((*state.db).clone())
        .get(account_id)
        .await?;
    auth.actor().ensure_can_access(account.user_id)?;

    Ok(Json(BalanceResponse {
        account_id: account.id,
        account_number: account.account_number,
        balance: account.balance,
        currency: account.currency,
        status: account.status,
        last_transaction_at: account.last_transaction_at.map(|t| t.with_timezone(&Utc)),
    }))
}

/// PATCH /accounts/{account_id}/status - Admin status change.
async fn update_status(
    State(state): State<AppState>,
    auth: AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiPath(account_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateStatusRequest>,
) -> ApiResult<Json<accounts::Model>> {
    let account = AccountRepository::new((*state.db).clone())
        .set_status(
            auth.actor(),
            account_id,
            payload.status,
            payload.reason.as_deref(),
            meta,
        )
        .await?;
    Ok(Json(account))
}
