#![allow(dead_code)]

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tenant_router::{
    ConnectionRouter, PgPoolConnector, PoolConnector, PoolSettings, StaticRegistry, TenantDescriptor, TenantPoolCache,
};

/// Builds lazy pools (no database is contacted) and counts constructions.
#[derive(Default)]
pub struct CountingConnector {
    calls: AtomicUsize,
}

impl CountingConnector {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PoolConnector for CountingConnector {
    async fn connect(&self, descriptor: &TenantDescriptor, settings: &PoolSettings) -> Result<PgPool, sqlx::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        PgPoolConnector.connect(descriptor, settings).await
    }
}

pub fn descriptor(id: &str) -> TenantDescriptor {
    TenantDescriptor::new(id, format!("postgres://localhost/{}", id), "app", "pw")
}

pub struct Fixture {
    pub registry: Arc<StaticRegistry>,
    pub connector: Arc<CountingConnector>,
    pub router: Arc<ConnectionRouter>,
}

pub fn fixture(ids: &[&str]) -> Fixture {
    let registry = Arc::new(StaticRegistry::with_tenants(ids.iter().map(|id| descriptor(id))));
    let connector = Arc::new(CountingConnector::default());
    let settings = PoolSettings::default().with_min_idle(0).lazy();
    let cache = Arc::new(TenantPoolCache::new(connector.clone(), settings));
    let router = Arc::new(ConnectionRouter::new(registry.clone(), cache));
    Fixture {
        registry,
        connector,
        router,
    }
}
