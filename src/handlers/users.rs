use crate::error::AppError;
use crate::extractors::{AuthenticatedPrincipal, CurrentTenantPool};
use crate::response::success_many_for;
use crate::service::UserService;
use axum::response::IntoResponse;

/// Users of the caller's own tenant.
pub async fn list_users(
    _principal: AuthenticatedPrincipal,
    CurrentTenantPool(pool): CurrentTenantPool,
) -> Result<impl IntoResponse, AppError> {
    let users = UserService::list(pool.pool()).await?;
    Ok(success_many_for(pool.tenant_id(), users))
}
