//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes under `/api/v1`
//! - Authentication and admin middleware
//! - Request extractors and error responses
//! - The scheduled EMI deduction job

pub mod error;
pub mod extractors;
pub mod jobs;
pub mod middleware;
pub mod routes;

use axum::Router;
use axum::http::HeaderValue;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use corebank_shared::JwtService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token operations.
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    /// Creates the state from a connection and a JWT service.
    #[must_use]
    pub fn new(db: DatabaseConnection, jwt_service: JwtService) -> Self {
        Self {
            db: Arc::new(db),
            jwt_service: Arc::new(jwt_service),
        }
    }
}

/// Creates the main application router.
///
/// `cors_origin` restricts CORS to a single origin; `None` allows any.
pub fn create_router(state: AppState, cors_origin: Option<&str>) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origin))
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match origin.and_then(|o| HeaderValue::from_str(o).ok()) {
        Some(origin) => layer.allow_origin(origin),
        None => layer.allow_origin(Any),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        Router,
        body::Body,
        http::{Request, Response},
    };
    use http_body_util::BodyExt;
    use sea_orm::DatabaseConnection;
    use tower::ServiceExt;

    use super::{AppState, create_router};
    use corebank_shared::{JwtConfig, JwtService};

    pub fn jwt() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "test-secret-key-that-is-long-enough".to_string(),
            access_token_expiry_secs: 900,
            refresh_token_expiry_secs: 3600,
        })
    }

    /// Router over a disconnected database; only paths that never query it
    /// can succeed.
    pub fn app() -> Router {
        create_router(AppState::new(DatabaseConnection::default(), jwt()), None)
    }

    pub async fn send(app: Router, request: Request<Body>) -> (u16, serde_json::Value) {
        let response: Response<Body> = app.oneshot(request).await.unwrap();
        let status = response.status().as_u16();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }
}
