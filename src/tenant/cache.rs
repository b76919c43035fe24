//! Concurrent cache of per-tenant connection pools.
//!
//! Each tenant id maps to a slot holding one construction attempt: a
//! [`OnceCell`] with the attempt's outcome. The slot is inserted before
//! construction starts, so concurrent first-time callers for the same tenant
//! all await the same cell. Exactly one of them runs the descriptor supplier
//! and the connector, and every caller that joined receives the same outcome,
//! pool or error. Lookups of already-built pools only take the shared read lock.
//!
//! A failed attempt is removed from the map once it settles, so the next call
//! starts a fresh attempt and lookups of unknown ids do not grow the map.

use crate::config::PoolSettings;
use crate::error::TenantError;
use crate::tenant::pool::{PoolConnector, TenantPool};
use crate::tenant::registry::TenantRegistry;
use crate::tenant::{TenantDescriptor, TenantId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

type Outcome = Result<Arc<TenantPool>, TenantError>;
type Slot = Arc<OnceCell<Outcome>>;

fn built(slot: &Slot) -> Option<&Arc<TenantPool>> {
    slot.get().and_then(|outcome| outcome.as_ref().ok())
}

fn failed(slot: &Slot) -> bool {
    matches!(slot.get(), Some(Err(_)))
}

pub struct TenantPoolCache {
    slots: RwLock<HashMap<TenantId, Slot>>,
    connector: Arc<dyn PoolConnector>,
    settings: PoolSettings,
}

impl TenantPoolCache {
    pub fn new(connector: Arc<dyn PoolConnector>, settings: PoolSettings) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            connector,
            settings,
        }
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// The pool for `tenant_id` if it has already been built.
    pub fn get(&self, tenant_id: &TenantId) -> Option<Arc<TenantPool>> {
        self.slots.read().get(tenant_id).and_then(built).cloned()
    }

    /// Return the cached pool for `tenant_id`, building it on a miss.
    ///
    /// `supplier` is only called on a miss, and for a given tenant only one
    /// attempt runs at a time. Callers arriving while it runs wait for it and
    /// get its result; a failure is cached for none of them.
    pub async fn get_or_create<F, Fut>(&self, tenant_id: &TenantId, supplier: F) -> Result<Arc<TenantPool>, TenantError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TenantDescriptor, TenantError>>,
    {
        if let Some(pool) = self.get(tenant_id) {
            return Ok(pool);
        }

        let slot = self.slot(tenant_id);
        let outcome = slot.get_or_init(|| self.build(tenant_id, supplier)).await.clone();
        if outcome.is_err() {
            self.discard(tenant_id, &slot);
        }
        outcome
    }

    /// Build a pool for every registered tenant that has none yet and return
    /// one of them (the first by tenant id that could be built).
    ///
    /// A tenant whose pool cannot be built is logged and skipped. The call
    /// fails only when no pool could be built at all.
    pub async fn populate_all(&self, registry: &dyn TenantRegistry) -> Result<Arc<TenantPool>, TenantError> {
        let descriptors = registry.list_all().await?;
        tracing::info!(tenants = descriptors.len(), cached = self.len(), "populating tenant pools");
        let mut first = None;
        let mut first_err = None;
        for descriptor in descriptors {
            let tenant_id = descriptor.tenant_id.clone();
            let result = self
                .get_or_create(&tenant_id, move || async move { Ok::<_, TenantError>(descriptor) })
                .await;
            match result {
                Ok(pool) => {
                    first.get_or_insert(pool);
                }
                Err(e) => {
                    tracing::warn!(tenant = %tenant_id, error = %e, "skipping tenant while populating pools");
                    first_err.get_or_insert(e);
                }
            }
        }
        match (first, first_err) {
            (Some(pool), _) => Ok(pool),
            (None, Some(e)) => Err(e),
            (None, None) => Err(TenantError::NoTenantResolved),
        }
    }

    /// Drop the cached pool for `tenant_id` so the next resolution rebuilds it
    /// from the registry. Units of work still holding the old pool keep using
    /// it; its connections close once the last of them lets go.
    pub fn invalidate(&self, tenant_id: &TenantId) -> bool {
        let removed = self.slots.write().remove(tenant_id);
        let was_built = removed.as_ref().and_then(built).is_some();
        if was_built {
            tracing::info!(tenant = %tenant_id, "invalidated tenant pool");
        }
        was_built
    }

    /// Remove and close every cached pool. Used on shutdown.
    pub async fn close_all(&self) {
        let slots: Vec<Slot> = self.slots.write().drain().map(|(_, slot)| slot).collect();
        for pool in slots.iter().filter_map(built) {
            tracing::info!(tenant = %pool.tenant_id(), pool = pool.name(), "closing tenant pool");
            pool.close().await;
        }
    }

    /// Number of built pools.
    pub fn len(&self) -> usize {
        self.slots.read().values().filter(|slot| built(slot).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, tenant_id: &TenantId) -> bool {
        self.get(tenant_id).is_some()
    }

    /// Ids of tenants with a built pool, sorted.
    pub fn cached_tenants(&self) -> Vec<TenantId> {
        let mut ids: Vec<TenantId> = self
            .slots
            .read()
            .iter()
            .filter(|(_, slot)| built(slot).is_some())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// The slot to await for `tenant_id`: the running or built attempt, or a
    /// fresh one in place of a failed attempt that has not been discarded yet.
    fn slot(&self, tenant_id: &TenantId) -> Slot {
        let existing = self.slots.read().get(tenant_id).cloned();
        match existing {
            Some(slot) if !failed(&slot) => slot,
            _ => {
                let mut slots = self.slots.write();
                let slot = slots.entry(tenant_id.clone()).or_default();
                if failed(slot) {
                    *slot = Slot::default();
                }
                slot.clone()
            }
        }
    }

    /// Remove a settled failed attempt, unless the map already holds a newer one.
    fn discard(&self, tenant_id: &TenantId, attempt: &Slot) {
        let mut slots = self.slots.write();
        if slots.get(tenant_id).is_some_and(|slot| Arc::ptr_eq(slot, attempt)) {
            slots.remove(tenant_id);
        }
    }

    async fn build<F, Fut>(&self, tenant_id: &TenantId, supplier: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TenantDescriptor, TenantError>>,
    {
        let descriptor = supplier().await?;
        if descriptor.tenant_id != *tenant_id {
            tracing::error!(
                requested = %tenant_id,
                supplied = %descriptor.tenant_id,
                "descriptor supplier returned another tenant"
            );
            return Err(TenantError::UnknownTenant(tenant_id.clone()));
        }
        let pool = self
            .connector
            .connect(&descriptor, &self.settings)
            .await
            .map_err(|source| {
                tracing::warn!(tenant = %tenant_id, error = %source, "tenant pool construction failed");
                TenantError::PoolConstructionFailed {
                    tenant_id: tenant_id.clone(),
                    source: Arc::new(source),
                }
            })?;
        let pool = Arc::new(TenantPool::new(descriptor.tenant_id, pool));
        tracing::info!(
            tenant = %tenant_id,
            pool = pool.name(),
            max_size = self.settings.max_size,
            min_idle = self.settings.min_idle,
            "configured tenant pool"
        );
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::pool::PgPoolConnector;
    use crate::tenant::registry::StaticRegistry;
    use async_trait::async_trait;
    use sqlx::PgPool;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Lazy pools (no database needed), with a call counter and a failure switch.
    #[derive(Default)]
    struct CountingConnector {
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    #[async_trait]
    impl PoolConnector for CountingConnector {
        async fn connect(&self, descriptor: &TenantDescriptor, settings: &PoolSettings) -> Result<PgPool, sqlx::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.failing.load(Ordering::SeqCst) {
                return Err(sqlx::Error::PoolTimedOut);
            }
            PgPoolConnector.connect(descriptor, settings).await
        }
    }

    fn cache() -> (Arc<TenantPoolCache>, Arc<CountingConnector>) {
        let connector = Arc::new(CountingConnector::default());
        let settings = PoolSettings::default().with_min_idle(0).lazy();
        (Arc::new(TenantPoolCache::new(connector.clone(), settings)), connector)
    }

    fn descriptor(id: &str) -> TenantDescriptor {
        TenantDescriptor::new(id, format!("postgres://localhost/{}", id), "app", "pw")
    }

    async fn supply(id: &str) -> Result<TenantDescriptor, TenantError> {
        Ok(descriptor(id))
    }

    async fn missing(id: &str) -> Result<TenantDescriptor, TenantError> {
        Err(TenantError::UnknownTenant(TenantId::new(id)))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_calls_construct_once() {
        let (cache, connector) = cache();
        let supplied = Arc::new(AtomicUsize::new(0));
        let id = TenantId::new("t1");

        let mut handles = Vec::new();
        for _ in 0..32 {
            let cache = cache.clone();
            let supplied = supplied.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_create(&id, || {
                        supplied.fetch_add(1, Ordering::SeqCst);
                        supply("t1")
                    })
                    .await
                    .unwrap()
            }));
        }
        let mut pools = Vec::new();
        for h in handles {
            pools.push(h.await.unwrap());
        }

        assert_eq!(supplied.load(Ordering::SeqCst), 1);
        assert_eq!(connector.calls.load(Ordering::SeqCst), 1);
        assert!(pools.iter().all(|p| Arc::ptr_eq(p, &pools[0])));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn hit_does_not_call_supplier() {
        let (cache, _) = cache();
        let id = TenantId::new("t1");
        let supplied = AtomicUsize::new(0);
        let supplier = || {
            supplied.fetch_add(1, Ordering::SeqCst);
            supply("t1")
        };
        let first = cache.get_or_create(&id, supplier).await.unwrap();
        let second = cache.get_or_create(&id, supplier).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(supplied.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_tenants_get_distinct_pools() {
        let (cache, _) = cache();
        let (t1, t2) = (TenantId::new("t1"), TenantId::new("t2"));
        let (p1, p2) = tokio::join!(
            cache.get_or_create(&t1, || supply("t1")),
            cache.get_or_create(&t2, || supply("t2")),
        );
        let (p1, p2) = (p1.unwrap(), p2.unwrap());
        assert!(!Arc::ptr_eq(&p1, &p2));
        assert_eq!(p1.tenant_id(), &TenantId::new("t1"));
        assert_eq!(p2.tenant_id(), &TenantId::new("t2"));
        assert_eq!(cache.cached_tenants(), vec![TenantId::new("t1"), TenantId::new("t2")]);
    }

    #[tokio::test]
    async fn failed_supplier_leaves_nothing_behind() {
        let (cache, connector) = cache();
        let id = TenantId::new("ghost");
        let err = cache
            .get_or_create(&id, || missing("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, TenantError::UnknownTenant(ref t) if t == "ghost"));
        assert!(cache.slots.read().is_empty());
        assert_eq!(connector.calls.load(Ordering::SeqCst), 0);

        // Registered later: the next call retries from scratch.
        let pool = cache.get_or_create(&id, || supply("ghost")).await.unwrap();
        assert_eq!(pool.tenant_id(), &id);
    }

    #[tokio::test]
    async fn construction_failure_is_retried_on_next_call() {
        let (cache, connector) = cache();
        let id = TenantId::new("t1");
        connector.failing.store(true, Ordering::SeqCst);
        let err = cache.get_or_create(&id, || supply("t1")).await.unwrap_err();
        assert!(matches!(err, TenantError::PoolConstructionFailed { .. }));
        assert!(!cache.contains(&id));

        connector.failing.store(false, Ordering::SeqCst);
        cache.get_or_create(&id, || supply("t1")).await.unwrap();
        assert!(cache.contains(&id));
        assert_eq!(connector.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn waiters_share_one_failed_attempt() {
        let (cache, connector) = cache();
        connector.failing.store(true, Ordering::SeqCst);
        let supplied = Arc::new(AtomicUsize::new(0));
        let id = TenantId::new("down");

        let mut handles = Vec::new();
        for _ in 0..10 {
            let cache = cache.clone();
            let supplied = supplied.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_create(&id, || {
                        supplied.fetch_add(1, Ordering::SeqCst);
                        supply("down")
                    })
                    .await
            }));
        }
        for h in handles {
            let err = h.await.unwrap().unwrap_err();
            assert!(matches!(err, TenantError::PoolConstructionFailed { ref tenant_id, .. } if tenant_id == "down"));
        }

        assert_eq!(connector.calls.load(Ordering::SeqCst), 1);
        assert_eq!(supplied.load(Ordering::SeqCst), 1);
        assert!(cache.slots.read().is_empty());

        connector.failing.store(false, Ordering::SeqCst);
        cache.get_or_create(&id, || supply("down")).await.unwrap();
        assert_eq!(connector.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn supplier_returning_another_tenant_is_rejected() {
        let (cache, _) = cache();
        let err = cache
            .get_or_create(&TenantId::new("t1"), || supply("t2"))
            .await
            .unwrap_err();
        assert!(matches!(err, TenantError::UnknownTenant(_)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn populate_all_builds_each_missing_pool_once() {
        let (cache, connector) = cache();
        let registry = StaticRegistry::with_tenants([descriptor("t2"), descriptor("t1"), descriptor("t3")]);

        cache.get_or_create(&TenantId::new("t2"), || supply("t2")).await.unwrap();
        let any = cache.populate_all(&registry).await.unwrap();
        assert_eq!(any.tenant_id(), &TenantId::new("t1"));
        assert_eq!(cache.len(), 3);
        assert_eq!(connector.calls.load(Ordering::SeqCst), 3);

        cache.populate_all(&registry).await.unwrap();
        assert_eq!(connector.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn populate_all_skips_tenants_that_cannot_be_built() {
        let (cache, _) = cache();
        let broken = TenantDescriptor::new("t1", "not a url", "app", "pw");
        let registry = StaticRegistry::with_tenants([broken, descriptor("t2"), descriptor("t3")]);

        let any = cache.populate_all(&registry).await.unwrap();
        assert_eq!(any.tenant_id(), &TenantId::new("t2"));
        assert_eq!(cache.cached_tenants(), vec![TenantId::new("t2"), TenantId::new("t3")]);
    }

    #[tokio::test]
    async fn populate_all_fails_when_nothing_can_be_built() {
        let (cache, _) = cache();
        let registry = StaticRegistry::with_tenants([TenantDescriptor::new("t1", "not a url", "app", "pw")]);
        let err = cache.populate_all(&registry).await.unwrap_err();
        assert!(matches!(err, TenantError::PoolConstructionFailed { .. }));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn populate_all_with_empty_registry_fails() {
        let (cache, _) = cache();
        let err = cache.populate_all(&StaticRegistry::new()).await.unwrap_err();
        assert!(matches!(err, TenantError::NoTenantResolved));
    }

    #[tokio::test]
    async fn invalidate_forces_rebuild() {
        let (cache, connector) = cache();
        let id = TenantId::new("t1");
        let old = cache.get_or_create(&id, || supply("t1")).await.unwrap();

        assert!(cache.invalidate(&id));
        assert!(!cache.invalidate(&id));

        let new = cache.get_or_create(&id, || supply("t1")).await.unwrap();
        assert!(!Arc::ptr_eq(&old, &new));
        assert_eq!(connector.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn close_all_empties_the_cache() {
        let (cache, _) = cache();
        let pool = cache
            .get_or_create(&TenantId::new("t1"), || supply("t1"))
            .await
            .unwrap();
        cache.close_all().await;
        assert!(cache.is_empty());
        assert!(pool.pool().is_closed());
    }
}
