//! Registry administration routes. These act across tenants, so they sit
//! behind the operator token rather than tenant sessions.

use crate::handlers::{invalidate_pool, list_tenants, put_tenant, remove_tenant};
use crate::middleware::require_operator;
use crate::state::AppState;
use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, put},
    Router,
};

pub fn admin_routes(state: AppState) -> Router {
    Router::new()
        .route("/admin/tenants", get(list_tenants))
        .route("/admin/tenants/:tenant_id", put(put_tenant).delete(remove_tenant))
        .route("/admin/tenants/:tenant_id/pool", delete(invalidate_pool))
        .route_layer(from_fn_with_state(state.clone(), require_operator))
        .with_state(state)
}
