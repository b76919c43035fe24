//! Login, sessions and the authenticated principal.
//!
//! A login names its tenant explicitly. The tenant is put into the unit of
//! work's context before any user lookup, so credentials are always checked
//! against that tenant's own database.

pub mod password;
pub mod principal;
pub mod session;

pub use password::verify_password;
pub use principal::{LoginRequest, Principal};
pub use session::SessionStore;

use crate::error::AppError;
use crate::service::UserService;
use crate::tenant::TenantId;
use sqlx::PgPool;

/// Check `username`/`password` against the tenant database behind `pool`.
///
/// Unknown users, wrong passwords and inactive accounts all fail the same way.
pub async fn authenticate(pool: &PgPool, tenant: &TenantId, username: &str, password: &str) -> Result<Principal, AppError> {
    let user = UserService::find_by_username(pool, username).await?;
    let hash = user.as_ref().map(|u| u.password_hash.clone());
    let matches = verify_password(password.to_string(), hash).await?;

    let user = match user {
        Some(user) if matches => user,
        _ => {
            tracing::info!(tenant = %tenant, username, "login rejected");
            return Err(AppError::Unauthorized("bad credentials".into()));
        }
    };
    if !user.active {
        tracing::info!(tenant = %tenant, username, "login rejected: account disabled");
        return Err(AppError::Unauthorized("bad credentials".into()));
    }

    let roles = UserService::roles_for(pool, user.id).await?;
    Ok(Principal::new(user.username, tenant.clone()).with_roles(roles))
}
