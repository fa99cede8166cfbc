//! Authentication middleware for protected routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use corebank_core::auth::Actor;
use corebank_db::UserRepository;
use corebank_shared::AppError;

use crate::AppState;
use crate::error::ApiError;

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authentication middleware that validates access tokens.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Validates it as an access token
/// 3. Loads the user, rejecting unknown and deactivated users
/// 4. Stores an [`Actor`] carrying the user's current role in request extensions
///
/// The role comes from the user record, not the token, so role changes and
/// deactivation apply to tokens that are already issued.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or_else(|| {
            ApiError::unauthorized("Authorization header with Bearer token is required")
        })?;

    let claims = state.jwt_service.validate_access_token(token)?;

    let user = UserRepository::new((*state.db).clone())
        .find_by_id(claims.user_id())
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    if !user.is_active {
        tracing::debug!(user_id = %user.id, "Rejected request from deactivated user");
        return Err(ApiError(AppError::Forbidden(
            "Your account has been deactivated. Please contact support.".to_string(),
        )));
    }

    request
        .extensions_mut()
        .insert(Actor::new(user.id, user.role.into()));
    Ok(next.run(request).await)
}

/// Rejects non-admins. Must run after [`auth_middleware`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let actor = request
        .extensions()
        .get::<Actor>()
        .copied()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    actor.ensure_admin()?;
    Ok(next.run(request).await)
}

/// Extractor for the authenticated user.
///
/// ```ignore
/// async fn handler(AuthUser(actor): AuthUser) -> impl IntoResponse {
///     let user_id = actor.user_id;
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Actor);

impl AuthUser {
    /// Returns the authenticated user's ID.
    #[must_use]
    pub const fn user_id(&self) -> uuid::Uuid {
        self.0.user_id
    }

    /// Returns the actor.
    #[must_use]
    pub const fn actor(&self) -> &Actor {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .copied()
            .map(AuthUser)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::test_support::{app, get, jwt, send};

    #[rstest]
    #[case("Bearer abc.def", Some("abc.def"))]
    #[case("bearer abc.def", Some("abc.def"))]
    #[case("Bearer   ", None)]
    #[case("Basic dXNlcg==", None)]
    fn test_extract_bearer_token(#[case] header: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_bearer_token(header), expected);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let (status, body) = send(app(), get("/api/v1/accounts")).await;
        assert_eq!(status, 401);
        assert_eq!(body["error"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_refresh_token_cannot_authenticate() {
        let token = jwt()
            .generate_refresh_token(uuid::Uuid::new_v4(), "customer")
            .unwrap();
        let request = axum::http::Request::builder()
            .uri("/api/v1/auth/me")
            .header("authorization", format!("Bearer {token}"))
            .body(axum::body::Body::empty())
            .unwrap();

        let (status, _) = send(app(), request).await;
        assert_eq!(status, 401);
    }

    #[tokio::test]
    async fn test_admin_routes_require_authentication() {
        let (status, _) = send(app(), get("/api/v1/admin/users")).await;
        assert_eq!(status, 401);
    }
}
