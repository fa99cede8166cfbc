//! API route definitions.

use axum::{Router, middleware};

use crate::{
    AppState,
    middleware::{auth_middleware, require_admin},
};

pub mod accounts;
pub mod admin;
pub mod auth;
pub mod health;
pub mod loans;
pub mod transactions;
pub mod users;

/// Creates the API router: public, authenticated and admin-only routes.
pub fn api_routes(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(loans::public_routes());

    // Protected routes that require authentication
    let protected_routes = Router::new()
        .merge(auth::protected_routes())
        .merge(users::routes())
        .merge(accounts::routes())
        .merge(transactions::routes())
        .merge(loans::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Admin routes; the auth layer runs first and installs the actor
    let admin_routes = admin::routes()
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
}
