//! Per-tenant connection pools and the seam that builds them.

use crate::config::PoolSettings;
use crate::tenant::{TenantDescriptor, TenantId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;

/// A live pool of connections to one tenant's database.
///
/// Owned by the pool cache; callers get it behind an `Arc` and must not keep it
/// past the unit of work, so that an invalidated pool can drain.
pub struct TenantPool {
    tenant_id: TenantId,
    name: String,
    pool: PgPool,
    created_at: DateTime<Utc>,
}

impl TenantPool {
    pub fn new(tenant_id: TenantId, pool: PgPool) -> Self {
        Self {
            name: PoolSettings::pool_name(tenant_id.as_str()),
            tenant_id,
            pool,
            created_at: Utc::now(),
        }
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl fmt::Debug for TenantPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantPool")
            .field("tenant_id", &self.tenant_id)
            .field("name", &self.name)
            .field("size", &self.pool.size())
            .field("idle", &self.pool.num_idle())
            .finish()
    }
}

/// Builds the underlying pool for a tenant descriptor.
#[async_trait]
pub trait PoolConnector: Send + Sync {
    async fn connect(&self, descriptor: &TenantDescriptor, settings: &PoolSettings) -> Result<PgPool, sqlx::Error>;
}

/// Connector for PostgreSQL tenant databases.
///
/// Credentials from the descriptor override any embedded in the url; empty
/// ones leave the url's untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct PgPoolConnector;

impl PgPoolConnector {
    pub fn connect_options(descriptor: &TenantDescriptor) -> Result<PgConnectOptions, sqlx::Error> {
        let mut options = PgConnectOptions::from_str(&descriptor.connection_url)?
            .application_name(&PoolSettings::pool_name(descriptor.tenant_id.as_str()));
        if !descriptor.username.is_empty() {
            options = options.username(&descriptor.username);
        }
        if !descriptor.password.is_empty() {
            options = options.password(&descriptor.password);
        }
        Ok(options)
    }

    pub fn pool_options(settings: &PoolSettings) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(settings.max_size)
            .min_connections(settings.min_idle)
            .acquire_timeout(settings.connection_timeout)
            .idle_timeout(settings.idle_timeout)
    }
}

#[async_trait]
impl PoolConnector for PgPoolConnector {
    async fn connect(&self, descriptor: &TenantDescriptor, settings: &PoolSettings) -> Result<PgPool, sqlx::Error> {
        let options = Self::connect_options(descriptor)?;
        let pool_options = Self::pool_options(settings);
        if settings.lazy {
            Ok(pool_options.connect_lazy_with(options))
        } else {
            pool_options.connect_with(options).await
        }
    }
}
