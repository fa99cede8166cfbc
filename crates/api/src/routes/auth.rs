//! Authentication routes for register, login, token refresh and logout.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use tracing::info;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    extractors::{ApiJson, ClientMeta, ValidatedJson},
    middleware::AuthUser,
};
use corebank_core::auth::{UserRole, hash_password, verify_password};
use corebank_db::{
    SessionRepository, UserRepository, entities::users, repositories::NewUser,
};
use corebank_shared::{
    AppError,
    auth::{AuthResponse, LoginRequest, LogoutRequest, RefreshRequest, RegisterRequest, UserInfo},
};

/// Creates the public auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

/// Auth routes that need an authenticated user.
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(me))
}

/// Public projection of a user record.
pub(crate) fn user_info(user: &users::Model) -> UserInfo {
    UserInfo {
        id: user.id,
        email: user.email.clone(),
        full_name: user.full_name.clone(),
        phone: user.phone.clone(),
        role: UserRole::from(user.role).as_str().to_string(),
        is_active: user.is_active,
        last_login_at: user.last_login_at.map(|t| t.with_timezone(&Utc)),
    }
}

/// Issues an access/refresh pair and records the refresh session.
async fn issue_tokens(
    state: &AppState,
    user: &users::Model,
    meta: &ClientMeta,
) -> ApiResult<AuthResponse> {
    let role = UserRole::from(user.role);
    let access_token = state
        .jwt_service
        .generate_access_token(user.id, role.as_str())?;
    let refresh_token = state
        .jwt_service
        .generate_refresh_token(user.id, role.as_str())?;

    let expires_at = Utc::now() + Duration::seconds(state.jwt_service.refresh_token_expires_in());
    SessionRepository::new((*state.db).clone())
        .create(
            user.id,
            &refresh_token,
            expires_at,
            meta.user_agent(),
            meta.ip(),
        )
        .await?;

    Ok(AuthResponse {
        user: user_info(user),
        access_token,
        refresh_token,
        expires_in: state.jwt_service.access_token_expires_in(),
    })
}

/// POST /auth/register - Create a customer and sign them in.
async fn register(
    State(state): State<AppState>,
    meta: ClientMeta,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_repo = UserRepository::new((*state.db).clone());

    if user_repo.email_exists(&payload.email).await? {
        return Err(ApiError(AppError::Conflict(
            "Email is already registered".to_string(),
        )));
    }
    if user_repo.national_id_exists(&payload.national_id).await? {
        return Err(ApiError(AppError::Conflict(
            "National ID is already registered".to_string(),
        )));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = user_repo
        .create(NewUser {
            email: payload.email,
            password_hash,
            full_name: payload.full_name,
            phone: payload.phone,
            national_id: payload.national_id,
            address: payload.address,
            role: UserRole::Customer,
        })
        .await?;

    info!(user_id = %user.id, "User registered");

    let response = issue_tokens(&state, &user, &meta).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/login - Authenticate user and return tokens.
async fn login(
    State(state): State<AppState>,
    meta: ClientMeta,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user_repo = UserRepository::new((*state.db).clone());

    let Some(user) = user_repo.find_by_email(&payload.email).await? else {
        info!(email = %payload.email, "Login attempt for non-existent user");
        return Err(ApiError::unauthorized("Invalid email or password"));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        info!(user_id = %user.id, "Failed login attempt - invalid password");
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    if !user.is_active {
        return Err(ApiError(AppError::Forbidden(
            "Your account has been deactivated. Please contact support.".to_string(),
        )));
    }

    user_repo.touch_last_login(user.id).await?;
    let user = user_repo.get(user.id).await?;

    info!(user_id = %user.id, "User logged in");
    Ok(Json(issue_tokens(&state, &user, &meta).await?))
}

/// POST /auth/refresh - Rotate a refresh token.
///
/// The presented session is revoked and a new pair is issued.
async fn refresh(
    State(state): State<AppState>,
    meta: ClientMeta,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let claims = state
        .jwt_service
        .validate_refresh_token(&payload.refresh_token)?;

    let sessions = SessionRepository::new((*state.db).clone());
    let session = sessions
        .find_by_token(&payload.refresh_token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Refresh token has been revoked"))?;

    if session.user_id != claims.user_id() {
        return Err(ApiError::unauthorized("Invalid or malformed token"));
    }

    let user = UserRepository::new((*state.db).clone())
        .find_by_id(claims.user_id())
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    if !user.is_active {
        sessions.revoke_all_user_sessions(user.id).await?;
        return Err(ApiError(AppError::Forbidden(
            "Your account has been deactivated. Please contact support.".to_string(),
        )));
    }

    sessions.revoke(session.id).await?;
    Ok(Json(issue_tokens(&state, &user, &meta).await?))
}

/// POST /auth/logout - Revoke a refresh token.
///
/// Unknown or already revoked tokens are accepted silently.
async fn logout(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LogoutRequest>,
) -> ApiResult<StatusCode> {
    let revoked = SessionRepository::new((*state.db).clone())
        .revoke_by_token(&payload.refresh_token)
        .await?;

    if revoked {
        info!("Session revoked on logout");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me - The authenticated user.
async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<UserInfo>> {
    let user = UserRepository::new((*state.db).clone())
        .get(auth.user_id())
        .await?;
    Ok(Json(user_info(&user)))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::test_support::{app, json_request, send};

    #[tokio::test]
    async fn test_register_validates_payload() {
        let body = json!({
            "email": "not-an-email",
            "password": "short",
            "full_name": "J",
            "phone": "1",
            "national_id": "1",
        });
        let (status, body) = send(app(), json_request("POST", "/api/v1/auth/register", &body)).await;

        assert_eq!(status, 400);
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert!(body["message"].as_str().unwrap().contains("valid email"));
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_json() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/v1/auth/login")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app(), request).await;

        assert_eq!(status, 400);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let token = crate::test_support::jwt()
            .generate_access_token(uuid::Uuid::new_v4(), "customer")
            .unwrap();
        let (status, _) = send(
            app(),
            json_request("POST", "/api/v1/auth/refresh", &json!({ "refresh_token": token })),
        )
        .await;

        assert_eq!(status, 401);
    }
}
