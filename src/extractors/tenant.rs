//! Request extractors for the tenant and the authenticated principal.
//!
//! Both read the unit of work set up by the `unit_of_work` middleware, so they
//! only see what that middleware bound for this request.

use crate::auth::Principal;
use crate::error::AppError;
use crate::state::AppState;
use crate::tenant::{current_principal, TenantId, TenantPool};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::sync::Arc;

/// Header carrying an explicit tenant id.
pub const TENANT_ID_HEADER: &str = "X-Tenant-ID";

/// Trimmed, non-empty `X-Tenant-ID` value.
pub fn tenant_from_headers(headers: &HeaderMap) -> Option<TenantId> {
    headers
        .get(TENANT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(TenantId::parse)
}

/// Token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The principal bound to this request; rejects with 401 when there is none.
#[derive(Clone, Debug)]
pub struct AuthenticatedPrincipal(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(_parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_principal()
            .map(AuthenticatedPrincipal)
            .ok_or_else(|| AppError::Unauthorized("authentication required".into()))
    }
}

/// The pool of the tenant this request resolves to.
pub struct CurrentTenantPool(pub Arc<TenantPool>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentTenantPool {
    type Rejection = AppError;

    async fn from_request_parts(_parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let pool = state.router.resolve().await?;
        Ok(CurrentTenantPool(pool))
    }
}
