//! Per-request unit of work and the operator guard of the admin routes.

use crate::error::AppError;
use crate::extractors::{bearer_token, tenant_from_headers};
use crate::state::AppState;
use crate::tenant::{bind_principal, TenantContext};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Run the request in its own tenant context.
///
/// A bearer token binds its session's principal; an `X-Tenant-ID` header sets
/// the tenant. A header naming a tenant other than the principal's is refused.
/// Install with `axum::middleware::from_fn_with_state`.
pub async fn unit_of_work(State(state): State<AppState>, request: Request, next: Next) -> Response {
    TenantContext::scope(async move {
        if let Err(e) = bind_request(&state, request.headers()) {
            return e.into_response();
        }
        next.run(request).await
    })
    .await
}

fn bind_request(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let principal = match bearer_token(headers) {
        Some(token) => Some(
            state
                .sessions
                .get(token)
                .ok_or_else(|| AppError::Unauthorized("invalid or expired session".into()))?,
        ),
        None => None,
    };
    let header_tenant = tenant_from_headers(headers);

    if let (Some(principal), Some(tenant)) = (&principal, &header_tenant) {
        if principal.tenant != *tenant {
            tracing::warn!(
                username = %principal.username,
                principal_tenant = %principal.tenant,
                requested = %tenant,
                "cross-tenant request refused"
            );
            return Err(AppError::Forbidden("tenant does not match the session".into()));
        }
    }
    if let Some(principal) = principal {
        bind_principal(principal)?;
    }
    if let Some(tenant) = header_tenant {
        TenantContext::set(tenant)?;
    }
    Ok(())
}

/// Admit only requests bearing the configured operator token. Without a
/// configured token the admin routes refuse everything.
pub async fn require_operator(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.admin_token.as_deref() else {
        return AppError::Forbidden("admin api is disabled".into()).into_response();
    };
    let admitted = match bearer_token(request.headers()) {
        Some(token) if tokens_match(token, expected) => Ok(()),
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "admin request with a wrong token");
            Err(AppError::Unauthorized("invalid operator token".into()))
        }
        None => Err(AppError::Unauthorized("operator token required".into())),
    };
    match admitted {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Comparison whose time does not depend on where the tokens differ.
fn tokens_match(given: &str, expected: &str) -> bool {
    let (given, expected) = (given.as_bytes(), expected.as_bytes());
    given.len() == expected.len() && given.iter().zip(expected).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_comparison() {
        assert!(tokens_match("op-secret", "op-secret"));
        assert!(!tokens_match("op-secreT", "op-secret"));
        assert!(!tokens_match("op", "op-secret"));
        assert!(!tokens_match("", "op-secret"));
    }
}
