//! Tenant-scoped routes. Every request runs in its own unit of work.

use crate::handlers::{list_users, login, logout, me};
use crate::middleware::unit_of_work;
use crate::state::AppState;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

const LOGIN_BODY_LIMIT: usize = 16 * 1024;

pub fn tenant_routes(state: AppState) -> Router {
    Router::new()
        .route("/login", post(login).layer(RequestBodyLimitLayer::new(LOGIN_BODY_LIMIT)))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/users", get(list_users))
        .layer(from_fn_with_state(state.clone(), unit_of_work))
        .with_state(state)
}
