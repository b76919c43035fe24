//! Tenant registry: the catalog of known tenants and their connection parameters.
//!
//! Read-through by contract: every call goes to the backing store, so a freshly
//! registered tenant is visible on the next lookup without a restart.

use crate::error::TenantError;
use crate::tenant::{TenantDescriptor, TenantId};
use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;

#[async_trait]
pub trait TenantRegistry: Send + Sync {
    /// All registered tenants, ordered by tenant id.
    async fn list_all(&self) -> Result<Vec<TenantDescriptor>, TenantError>;

    /// One tenant, or `None` when the id is not registered.
    async fn find_by_id(&self, tenant_id: &TenantId) -> Result<Option<TenantDescriptor>, TenantError>;
}

/// Registry backed by the `master_tenant` table of the master database.
#[derive(Clone)]
pub struct PgTenantRegistry {
    pool: PgPool,
    table: String,
}

impl PgTenantRegistry {
    /// `table` is the schema-qualified registry table (see `Settings::registry_table`).
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }
}

type TenantRow = (String, String, String, String);

/// Rows with an empty id or url cannot be routed to and are skipped.
fn descriptor_from_row((id, url, username, password): TenantRow) -> Option<TenantDescriptor> {
    let Some(tenant_id) = TenantId::parse(&id) else {
        tracing::warn!("master_tenant row with empty tenant_id, skipping");
        return None;
    };
    if url.trim().is_empty() {
        tracing::warn!(tenant = %tenant_id, "tenant has no connection url, skipping");
        return None;
    }
    Some(TenantDescriptor {
        tenant_id,
        connection_url: url,
        username,
        password,
    })
}

#[async_trait]
impl TenantRegistry for PgTenantRegistry {
    async fn list_all(&self) -> Result<Vec<TenantDescriptor>, TenantError> {
        let sql = format!(
            "SELECT tenant_id, url, username, password FROM {} ORDER BY tenant_id",
            self.table
        );
        let rows = sqlx::query_as::<_, TenantRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TenantError::RegistryUnavailable(Arc::new(e)))?;
        let descriptors: Vec<_> = rows.into_iter().filter_map(descriptor_from_row).collect();
        tracing::debug!(tenants = descriptors.len(), "loaded tenant registry");
        Ok(descriptors)
    }

    async fn find_by_id(&self, tenant_id: &TenantId) -> Result<Option<TenantDescriptor>, TenantError> {
        let sql = format!(
            "SELECT tenant_id, url, username, password FROM {} WHERE tenant_id = $1",
            self.table
        );
        let row = sqlx::query_as::<_, TenantRow>(&sql)
            .bind(tenant_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TenantError::RegistryUnavailable(Arc::new(e)))?;
        Ok(row.and_then(descriptor_from_row))
    }
}

/// In-memory registry, for tenants supplied by configuration and for tests.
#[derive(Default)]
pub struct StaticRegistry {
    by_id: RwLock<BTreeMap<TenantId, TenantDescriptor>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenants(descriptors: impl IntoIterator<Item = TenantDescriptor>) -> Self {
        let registry = Self::new();
        for d in descriptors {
            registry.register(d);
        }
        registry
    }

    /// Register or replace a tenant. Returns the previous descriptor, if any.
    pub fn register(&self, descriptor: TenantDescriptor) -> Option<TenantDescriptor> {
        self.by_id.write().insert(descriptor.tenant_id.clone(), descriptor)
    }

    pub fn deregister(&self, tenant_id: &TenantId) -> Option<TenantDescriptor> {
        self.by_id.write().remove(tenant_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.read().is_empty()
    }
}

#[async_trait]
impl TenantRegistry for StaticRegistry {
    async fn list_all(&self) -> Result<Vec<TenantDescriptor>, TenantError> {
        Ok(self.by_id.read().values().cloned().collect())
    }

    async fn find_by_id(&self, tenant_id: &TenantId) -> Result<Option<TenantDescriptor>, TenantError> {
        Ok(self.by_id.read().get(tenant_id).cloned())
    }
}
