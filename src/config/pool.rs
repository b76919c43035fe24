//! Per-tenant pool parameters.

use std::time::Duration;

/// Bounds applied to every tenant pool. Defaults match the settings the
/// tenant data sources have always been created with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolSettings {
    /// Maximum number of connections, idle and in use.
    pub max_size: u32,
    /// Idle connections the pool tries to keep open.
    pub min_idle: u32,
    /// Maximum wait for a connection before acquisition fails.
    pub connection_timeout: Duration,
    /// How long a connection may sit idle before it is closed.
    pub idle_timeout: Duration,
    /// When true, no connection is opened until the first acquire.
    pub lazy: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: 20,
            min_idle: 10,
            connection_timeout: Duration::from_millis(20_000),
            idle_timeout: Duration::from_millis(300_000),
            lazy: false,
        }
    }
}

impl PoolSettings {
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_min_idle(mut self, min_idle: u32) -> Self {
        self.min_idle = min_idle;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Pool name for a tenant, used in logs and as the connection's `application_name`.
    pub fn pool_name(tenant_id: &str) -> String {
        format!("{}-connection-pool", tenant_id)
    }
}
