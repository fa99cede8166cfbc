//! Transaction routes: postings, history, statements and receipts.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiResult,
    extractors::{ApiJson, ApiPath, ApiQuery, Pagination},
    middleware::AuthUser,
};
use corebank_core::ledger::{Receipt, TransactionStatus, TransactionType};
use corebank_db::{
    AccountRepository, LedgerRepository,
    entities::transactions,
    repositories::{PostingRequest, Statement, TransactionFilter, TransferRequest},
};
use corebank_shared::types::PageResponse;

/// Creates the transaction routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions))
        .route("/transactions/deposit", post(deposit))
        .route("/transactions/withdraw", post(withdraw))
        .route("/transactions/transfer", post(transfer))
        .route("/transactions/statement/{account_id}", get(statement))
        .route("/transactions/{transaction_id}", get(get_transaction))
        .route("/transactions/{transaction_id}/receipt", get(receipt))
}

/// Request body for a deposit or withdrawal.
#[derive(Debug, Deserialize)]
pub struct PostingBody {
    /// Account to post to.
    pub account_id: Uuid,
    /// Amount, at least 1.00 with at most two decimals.
    pub amount: Decimal,
    /// Optional description (max 200 characters).
    pub description: Option<String>,
}

/// Request body for a transfer.
#[derive(Debug, Deserialize)]
pub struct TransferBody {
    /// Source account (must be owned by the caller).
    pub from_account_id: Uuid,
    /// Destination account.
    pub to_account_id: Uuid,
    /// Amount.
    pub amount: Decimal,
    /// Optional description.
    pub description: Option<String>,
}

/// Query parameters for listing transactions.
#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsQuery {
    /// Restrict to one account. Without it, the caller's own transactions are listed.
    pub account_id: Option<Uuid>,
    /// Filter by type.
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// Filter by status.
    pub status: Option<TransactionStatus>,
    /// Created at or after.
    pub start_date: Option<DateTime<Utc>>,
    /// Created before.
    pub end_date: Option<DateTime<Utc>>,
    /// Minimum amount.
    pub min_amount: Option<Decimal>,
    /// Maximum amount.
    pub max_amount: Option<Decimal>,
}

/// Statement period; defaults to the current month.
#[derive(Debug, Deserialize)]
pub struct StatementQuery {
    /// Month (1-12).
    pub month: Option<u32>,
    /// Year.
    pub year: Option<i32>,
}

impl From<PostingBody> for PostingRequest {
    fn from(body: PostingBody) -> Self {
        Self {
            account_id: body.account_id,
            amount: body.amount,
            description: body.description,
        }
    }
}

/// POST /transactions/deposit
async fn deposit(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<PostingBody>,
) -> ApiResult<impl IntoResponse> {
    let posted = LedgerRepository::new((*state.db).clone())
        .deposit(auth.actor(), payload.into())
        .await?;
    Ok((StatusCode::CREATED, Json(posted)))
}

/// POST /transactions/withdraw
async fn withdraw(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<PostingBody>,
) -> ApiResult<impl IntoResponse> {
    let posted = LedgerRepository::new((*state.db).clone())
        .withdraw(auth.actor(), payload.into())
        .await?;
    Ok((StatusCode::CREATED, Json(posted)))
}

/// POST /transactions/transfer
async fn transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<TransferBody>,
) -> ApiResult<impl IntoResponse> {
    let transfer = LedgerRepository::new((*state.db).clone())
        .transfer(
            auth.actor(),
            TransferRequest {
                from_account_id: payload.from_account_id,
                to_account_id: payload.to_account_id,
                amount: payload.amount,
                description: payload.description,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(transfer)))
}

/// GET /transactions
async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Pagination(page): Pagination,
    ApiQuery(query): ApiQuery<ListTransactionsQuery>,
) -> ApiResult<Json<PageResponse<transactions::Model>>> {
    let mut filter = TransactionFilter {
        account_id: query.account_id,
        user_id: None,
        transaction_type: query.transaction_type,
        status: query.status,
        from: query.start_date,
        to: query.end_date,
        min_amount: query.min_amount,
        max_amount: query.max_amount,
    };

    match query.account_id {
        Some(account_id) => {
            let account = AccountRepository::new((*state.db).clone())
                .get(account_id)
                .await?;
            auth.actor().ensure_can_access(account.user_id)?;
        }
        None => filter.user_id = Some(auth.user_id()),
    }

    let result = LedgerRepository::new((*state.db).clone())
        .list(&filter, &page)
        .await?;
    Ok(Json(result))
}

/// GET /transactions/{transaction_id}
async fn get_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(transaction_id): ApiPath<Uuid>,
) -> ApiResult<Json<transactions::Model>> {
    let transaction = LedgerRepository::new((*state.db).clone())
        .get(transaction_id)
        .await?;
    auth.actor().ensure_can_access(transaction.user_id)?;
    Ok(Json(transaction))
}

/// GET /transactions/{transaction_id}/receipt
async fn receipt(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(transaction_id): ApiPath<Uuid>,
) -> ApiResult<Json<Receipt>> {
    let (receipt, transaction) = LedgerRepository::new((*state.db).clone())
        .receipt(transaction_id)
        .await?;
    auth.actor().ensure_can_access(transaction.user_id)?;
    Ok(Json(receipt))
}

/// GET /transactions/statement/{account_id}?month=&year=
async fn statement(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(account_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<StatementQuery>,
) -> ApiResult<Json<Statement>> {
    let account = AccountRepository::new((*state.db).clone())
        .get(account_id)
        .await?;
    auth.actor().ensure_can_access(account.user_id)?;

    let now = Utc::now();
    let month = query.month.unwrap_or_else(|| now.month());
    let year = query.year.unwrap_or_else(|| now.year());

    let statement = LedgerRepository::new((*state.db).clone())
        .statement(account_id, month, year)
        .await?;

    info!(%account_id, month, year, "Statement generated");
    Ok(Json(statement))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::test_support::{app, json_request, send};

    #[tokio::test]
    async fn test_deposit_requires_authentication() {
        let body = json!({ "account_id": uuid::Uuid::new_v4(), "amount": "10.00" });
        let (status, _) = send(app(), json_request("POST", "/api/v1/transactions/deposit", &body)).await;
        assert_eq!(status, 401);
    }
}
