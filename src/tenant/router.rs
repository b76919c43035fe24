//! Routing of a unit of work to its tenant's pool.

use crate::error::TenantError;
use crate::tenant::cache::TenantPoolCache;
use crate::tenant::context::{current_principal, TenantContext};
use crate::tenant::pool::TenantPool;
use crate::tenant::registry::TenantRegistry;
use crate::tenant::{TenantDescriptor, TenantId};
use async_trait::async_trait;
use std::sync::Arc;

/// Source of the authenticated principal's tenant, consulted when the
/// context holds no tenant.
pub trait PrincipalLookup: Send + Sync {
    fn principal_tenant(&self) -> Option<TenantId>;
}

/// Reads the principal bound to the current unit of work.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoundPrincipal;

impl PrincipalLookup for BoundPrincipal {
    fn principal_tenant(&self) -> Option<TenantId> {
        current_principal().map(|p| p.tenant)
    }
}

/// What data-access code asks for a pool. Implemented by [`ConnectionRouter`].
#[async_trait]
pub trait TenantPoolSelector: Send + Sync {
    /// Some registered tenant's pool; for bootstrap paths with no tenant.
    async fn select_any(&self) -> Result<Arc<TenantPool>, TenantError>;

    /// The pool of `tenant_id`, built on first use.
    async fn select_for(&self, tenant_id: &TenantId) -> Result<Arc<TenantPool>, TenantError>;
}

/// Resolves the current unit of work to a tenant pool.
///
/// Never substitutes another tenant's pool: an unknown or missing tenant is an
/// error, not a fallback.
pub struct ConnectionRouter {
    registry: Arc<dyn TenantRegistry>,
    cache: Arc<TenantPoolCache>,
    principals: Arc<dyn PrincipalLookup>,
}

impl ConnectionRouter {
    pub fn new(registry: Arc<dyn TenantRegistry>, cache: Arc<TenantPoolCache>) -> Self {
        Self {
            registry,
            cache,
            principals: Arc::new(BoundPrincipal),
        }
    }

    pub fn with_principal_lookup(mut self, principals: Arc<dyn PrincipalLookup>) -> Self {
        self.principals = principals;
        self
    }

    pub fn registry(&self) -> &Arc<dyn TenantRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<TenantPoolCache> {
        &self.cache
    }

    /// Pool for the current unit of work's tenant.
    pub async fn resolve(&self) -> Result<Arc<TenantPool>, TenantError> {
        let tenant_id = self.current_tenant()?;
        self.select_for(&tenant_id).await
    }

    /// Ensure every registered tenant has a pool and return one of them.
    pub async fn resolve_any(&self) -> Result<Arc<TenantPool>, TenantError> {
        self.cache.populate_all(self.registry.as_ref()).await
    }

    /// The tenant of the current unit of work. When the context is empty the
    /// principal's tenant is used and written back into the context.
    pub fn current_tenant(&self) -> Result<TenantId, TenantError> {
        if let Some(tenant_id) = TenantContext::get() {
            return Ok(tenant_id);
        }
        let tenant_id = self
            .principals
            .principal_tenant()
            .ok_or(TenantError::NoTenantResolved)?;
        tracing::debug!(tenant = %tenant_id, "tenant restored from principal");
        if TenantContext::set(tenant_id.clone()).is_err() {
            tracing::debug!(tenant = %tenant_id, "no unit of work to restore the tenant into");
        }
        Ok(tenant_id)
    }
}

#[async_trait]
impl TenantPoolSelector for ConnectionRouter {
    async fn select_any(&self) -> Result<Arc<TenantPool>, TenantError> {
        self.resolve_any().await
    }

    async fn select_for(&self, tenant_id: &TenantId) -> Result<Arc<TenantPool>, TenantError> {
        self.cache
            .get_or_create(tenant_id, || registered(self.registry.as_ref(), tenant_id))
            .await
    }
}

async fn registered(registry: &dyn TenantRegistry, tenant_id: &TenantId) -> Result<TenantDescriptor, TenantError> {
    match registry.find_by_id(tenant_id).await? {
        Some(descriptor) => Ok(descriptor),
        None => {
            tracing::warn!(tenant = %tenant_id, "tenant is not registered");
            Err(TenantError::UnknownTenant(tenant_id.clone()))
        }
    }
}
