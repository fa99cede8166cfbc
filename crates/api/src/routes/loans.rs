//! Loan routes: EMI calculator, applications, decisions and repayments.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    error::ApiResult,
    extractors::{ApiJson, ApiPath, ClientMeta, ValidatedJson},
    middleware::AuthUser,
};
use corebank_core::loan::{
    AmortizationRow, LoanApplication, LoanDetails, amortization_schedule,
};
use corebank_db::{
    LoanRepository,
    entities::loans,
    repositories::{Disbursement, EmiPayment},
};

const EMI_FORMULA: &str = "EMI = [P x R x (1 + R)^N] / [(1 + R)^N - 1]";

/// Routes that need no authentication.
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/loans/calculate-emi", post(calculate_emi))
}

/// Creates the loan routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/loans", get(list_loans).post(apply))
        .route("/loans/{loan_id}", get(get_loan))
        .route("/loans/{loan_id}/schedule", get(schedule))
        .route("/loans/{loan_id}/pay-emi", post(pay_emi))
        .route("/loans/{loan_id}/approve", post(approve))
        .route("/loans/{loan_id}/reject", post(reject))
}

/// Request body for the EMI calculator.
#[derive(Debug, Deserialize)]
pub struct CalculateEmiRequest {
    /// Principal.
    pub principal: Decimal,
    /// Annual interest rate in percent.
    pub interest_rate: Decimal,
    /// Tenure in months.
    pub tenure_months: u32,
}

/// EMI calculator result.
#[derive(Debug, Serialize)]
pub struct CalculateEmiResponse {
    /// Totals.
    #[serde(flatten)]
    pub details: LoanDetails,
    /// The formula used.
    pub formula: &'static str,
    /// Month-by-month split, without due dates.
    pub schedule: Vec<AmortizationRow>,
}

/// Repayment schedule of a loan.
#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    /// Loan ID.
    pub loan_id: Uuid,
    /// Totals.
    pub details: LoanDetails,
    /// Installments; due dates are set once the loan is approved.
    pub schedule: Vec<AmortizationRow>,
}

/// Request body for rejecting a loan.
#[derive(Debug, Deserialize, Validate)]
pub struct RejectLoanRequest {
    /// Reason shown to the applicant.
    #[validate(length(min = 5, max = 500, message = "Rejection reason must be 5-500 characters"))]
    pub reason: String,
}

/// POST /loans/calculate-emi
async fn calculate_emi(
    ApiJson(payload): ApiJson<CalculateEmiRequest>,
) -> ApiResult<Json<CalculateEmiResponse>> {
    let details = LoanDetails::calculate(
        payload.principal,
        payload.interest_rate,
        payload.tenure_months,
    )?;

    Ok(Json(CalculateEmiResponse {
        details,
        formula: EMI_FORMULA,
        schedule: amortization_schedule(&details, None)?,
    }))
}

/// POST /loans - Apply for a loan against one of the caller's accounts.
async fn apply(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<LoanApplication>,
) -> ApiResult<impl IntoResponse> {
    let loan = LoanRepository::new((*state.db).clone())
        .apply(auth.actor(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// GET /loans - The caller's loans.
async fn list_loans(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<loans::Model>>> {
    let loans = LoanRepository::new((*state.db).clone())
        .list_by_user(auth.user_id())
        .await?;
    Ok(Json(loans))
}

/// GET /loans/{loan_id}
async fn get_loan(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(loan_id): ApiPath<Uuid>,
) -> ApiResult<Json<loans::Model>> {
    let loan = LoanRepository::new((*state.db).clone())
        .get(loan_id)
        .await?;
    auth.actor().ensure_can_access(loan.user_id)?;
    Ok(Json(loan))
}

/// GET /loans/{loan_id}/schedule
async fn schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(loan_id): ApiPath<Uuid>,
) -> ApiResult<Json<ScheduleResponse>> {
    let loan = LoanRepository::new((*state.db).clone())
        .get(loan_id)
        .await?;
    auth.actor().ensure_can_access(loan.user_id)?;

    let tenure = u32::try_from(loan.tenure_months).unwrap_or_default();
    let details = LoanDetails::calculate(loan.principal, loan.interest_rate, tenure)?;

    Ok(Json(ScheduleResponse {
        loan_id: loan.id,
        schedule: amortization_schedule(&details, loan.emi_start_date)?,
        details,
    }))
}

/// POST /loans/{loan_id}/pay-emi - Pay the next installment now.
async fn pay_emi(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(loan_id): ApiPath<Uuid>,
) -> ApiResult<Json<EmiPayment>> {
    let payment = LoanRepository::new((*state.db).clone())
        .deduct_emi(loan_id, Some(auth.actor()), false, Utc::now().date_naive())
        .await?;
    Ok(Json(payment))
}

/// POST /loans/{loan_id}/approve - Approve and disburse (admin).
async fn approve(
    State(state): State<AppState>,
    auth: AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiPath(loan_id): ApiPath<Uuid>,
) -> ApiResult<Json<Disbursement>> {
    let disbursement = LoanRepository::new((*state.db).clone())
        .approve(auth.actor(), loan_id, meta)
        .await?;
    Ok(Json(disbursement))
}

/// POST /loans/{loan_id}/reject - Reject with a reason (admin).
async fn reject(
    State(state): State<AppState>,
    auth: AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiPath(loan_id): ApiPath<Uuid>,
    ValidatedJson(payload): ValidatedJson<RejectLoanRequest>,
) -> ApiResult<Json<loans::Model>> {
    let loan = LoanRepository::new((*state.db).clone())
        .reject(auth.actor(), loan_id, &payload.reason, meta)
        .await?;
    Ok(Json(loan))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use crate::test_support::{app, json_request, send};

    #[tokio::test]
    async fn test_calculate_emi_is_public() {
        let body = json!({ "principal": 100000, "interest_rate": 12, "tenure_months": 12 });
        let (status, body) =
            send(app(), json_request("POST", "/api/v1/loans/calculate-emi", &body)).await;

        assert_eq!(status, 200);
        assert_eq!(body["emi"], "8884.88");
        assert_eq!(body["schedule"].as_array().unwrap().len(), 12);
        let last: Decimal = body["schedule"][11]["remaining_principal"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(last.is_zero());
    }

    #[tokio::test]
    async fn test_calculate_emi_rejects_short_tenure() {
        let body = json!({ "principal": 5000, "interest_rate": 10, "tenure_months": 3 });
        let (status, body) =
            send(app(), json_request("POST", "/api/v1/loans/calculate-emi", &body)).await;

        assert_eq!(status, 400);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_calculate_emi_rejects_huge_principal() {
        for principal in ["79228162514264337593543950335", "1000000000000"] {
            let body = json!({ "principal": principal, "interest_rate": 12, "tenure_months": 12 });
            let (status, body) =
                send(app(), json_request("POST", "/api/v1/loans/calculate-emi", &body)).await;

            assert_eq!(status, 400);
            assert_eq!(body["error"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn test_loan_application_requires_authentication() {
        let (status, _) = send(app(), json_request("POST", "/api/v1/loans", &json!({}))).await;
        assert_eq!(status, 401);
    }
}
