//! Login, logout and the current-user page.

use crate::auth::{authenticate, LoginRequest};
use crate::error::AppError;
use crate::extractors::{bearer_token, AuthenticatedPrincipal, CurrentTenantPool};
use crate::response::success_one_ok;
use crate::state::AppState;
use crate::tenant::{TenantContext, TenantId};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub tenant: TenantId,
    pub roles: Vec<String>,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub username: String,
    pub tenant: TenantId,
    pub roles: Vec<String>,
    pub pool: String,
}

/// The login's tenant is set into the context before the user is looked up,
/// so the lookup runs against that tenant's database.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tenant_id = body.tenant_id()?;
    TenantContext::set(tenant_id.clone())?;
    let pool = state.router.resolve().await?;
    let principal = authenticate(pool.pool(), &tenant_id, body.username.trim(), &body.password).await?;
    tracing::info!(tenant = %tenant_id, username = %principal.username, "login");
    let token = state.sessions.issue(principal.clone());
    Ok(success_one_ok(LoginResponse {
        token,
        username: principal.username,
        tenant: principal.tenant,
        roles: principal.roles,
    }))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode, AppError> {
    let token = bearer_token(&headers).ok_or_else(|| AppError::Unauthorized("authentication required".into()))?;
    state.sessions.revoke(token);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    CurrentTenantPool(pool): CurrentTenantPool,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(MeResponse {
        username: principal.username,
        tenant: principal.tenant,
        roles: principal.roles,
        pool: pool.name().to_string(),
    }))
}
