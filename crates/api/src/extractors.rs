//! Request extractors that reject with [`ApiError`] bodies.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{header::USER_AGENT, request::Parts},
};
use corebank_core::audit::RequestMeta;
use corebank_shared::types::PageRequest;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ApiError;

/// JSON body that is validated with `validator` before reaching the handler.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// JSON body whose rules are checked by the domain layer.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Query string extractor.
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Path parameter extractor.
#[derive(Debug, Clone)]
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// `page` / `per_page` (alias `limit`) query parameters, clamped.
#[derive(Debug, Clone)]
pub struct Pagination(pub PageRequest);

impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ApiQuery(page) = ApiQuery::<PageRequest>::from_request_parts(parts, state).await?;
        Ok(Self(page.normalized()))
    }
}

/// Client IP and user agent, recorded with audit entries and sessions.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta(pub RequestMeta);

impl ClientMeta {
    /// Client IP address.
    #[must_use]
    pub fn ip(&self) -> Option<&str> {
        self.0.ip_address.as_deref()
    }

    /// Client user agent.
    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.0.user_agent.as_deref()
    }
}

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        // First hop of X-Forwarded-For is the original client.
        let ip_address = header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .or_else(|| header("x-real-ip"))
            .map(ToString::to_string);
        let user_agent = header(USER_AGENT.as_str()).map(ToString::to_string);

        Ok(Self(RequestMeta {
            ip_address,
            user_agent,
        }))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn meta_of(request: Request<()>) -> RequestMeta {
        let (mut parts, ()) = request.into_parts();
        let ClientMeta(meta) = ClientMeta::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        meta
    }

    #[tokio::test]
    async fn test_client_meta_uses_first_forwarded_hop() {
        let meta = meta_of(
            Request::builder()
                .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
                .header("user-agent", "curl/8.0")
                .body(())
                .unwrap(),
        )
        .await;

        assert_eq!(meta.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[tokio::test]
    async fn test_client_meta_without_headers() {
        let meta = meta_of(Request::builder().body(()).unwrap()).await;
        assert_eq!(meta, RequestMeta::default());
    }

    #[tokio::test]
    async fn test_pagination_is_clamped() {
        let (mut parts, ()) = Request::builder()
            .uri("/items?page=0&limit=1000")
            .body(())
            .unwrap()
            .into_parts();
        let Pagination(page) = Pagination::from_request_parts(&mut parts, &())
            .await
            .unwrap();

        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 100);
    }
}
