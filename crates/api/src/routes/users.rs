//! User profile routes.

use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    error::ApiResult,
    extractors::{ApiPath, ValidatedJson},
    middleware::AuthUser,
};
use corebank_db::{
    AccountRepository, LoanRepository, UserRepository,
    entities::{accounts, loans, users},
    repositories::ProfileUpdate,
};

/// Creates the user routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/profile", get(get_profile).put(update_profile))
        .route("/users/{user_id}", get(get_user))
}

/// Request body for updating the caller's profile.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    /// Full name.
    #[validate(length(min = 2, max = 100, message = "Full name must be 2-100 characters"))]
    pub full_name: Option<String>,
    /// Contact phone number.
    #[validate(length(min = 7, max = 20, message = "Phone must be 7-20 characters"))]
    pub phone: Option<String>,
    /// Postal address. An empty string clears it.
    #[validate(length(max = 300, message = "Address must be at most 300 characters"))]
    pub address: Option<String>,
}

/// Profile with owned accounts.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    /// The user.
    pub user: users::Model,
    /// Accounts, oldest first.
    pub accounts: Vec<accounts::Model>,
}

/// Full user record for admins.
#[derive(Debug, Serialize)]
pub struct UserDetailResponse {
    /// The user.
    pub user: users::Model,
    /// Accounts, oldest first.
    pub accounts: Vec<accounts::Model>,
    /// Loans, newest first.
    pub loans: Vec<loans::Model>,
}

/// GET /users/profile
async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    let user = UserRepository::new((*state.db).clone())
        .get(auth.user_id())
        .await?;
    let accounts = AccountRepository::new((*state.db).clone())
        .list_by_user(user.id)
        .await?;

    Ok(Json(ProfileResponse { user, accounts }))
}

/// PUT /users/profile
async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(payload): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<Json<users::Model>> {
    let user = UserRepository::new((*state.db).clone())
        .update_profile(
            auth.user_id(),
            ProfileUpdate {
                full_name: payload.full_name,
                phone: payload.phone,
                address: payload.address,
            },
        )
        .await?;

    info!(user_id = %user.id, "Profile updated");
    Ok(Json(user))
}

/// GET /users/{user_id} - Admin view of any user.
async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<Json<UserDetailResponse>> {
    auth.actor().ensure_admin()?;

    let user = UserRepository::new((*state.db).clone())
        .get(user_id)
        .await?;
    let accounts = AccountRepository::new((*state.db).clone())
        .list_by_user(user_id)
        .await?;
    let loans = LoanRepository::new((*state.db).clone())
        .list_by_user(user_id)
        .await?;

    Ok(Json(UserDetailResponse {
        user,
        accounts,
        loans,
    }))
}
