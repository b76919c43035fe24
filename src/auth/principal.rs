use crate::error::AppError;
use crate::tenant::TenantId;
use serde::{Deserialize, Serialize};

/// An authenticated user, bound to exactly one tenant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub username: String,
    pub tenant: TenantId,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(username: impl Into<String>, tenant: impl Into<TenantId>) -> Self {
        Self {
            username: username.into(),
            tenant: tenant.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }
}

/// Body of `POST /login`.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub tenant: String,
}

impl LoginRequest {
    /// The login's tenant, after checking that username and tenant are present.
    pub fn tenant_id(&self) -> Result<TenantId, AppError> {
        let tenant = TenantId::parse(&self.tenant);
        match tenant {
            Some(tenant) if !self.username.trim().is_empty() => Ok(tenant),
            _ => Err(AppError::BadRequest("username and tenant must be provided".into())),
        }
    }
}
