mod common;

use common::{descriptor, fixture};
use std::sync::Arc;
use tenant_router::auth::Principal;
use tenant_router::tenant::bind_principal;
use tenant_router::{TenantContext, TenantError, TenantId, TenantPoolSelector};

#[tokio::test]
async fn units_of_work_are_routed_to_their_own_tenant() {
    let f = fixture(&["t1", "t2"]);

    let (p1, p1_again) = TenantContext::scope(async {
        TenantContext::set("t1").unwrap();
        (f.router.resolve().await.unwrap(), f.router.resolve().await.unwrap())
    })
    .await;
    assert!(Arc::ptr_eq(&p1, &p1_again));
    assert_eq!(p1.name(), "t1-connection-pool");

    let p2 = TenantContext::scope_with("t2", async { f.router.resolve().await.unwrap() }).await;
    assert!(!Arc::ptr_eq(&p1, &p2));
    assert_eq!(p2.tenant_id(), &TenantId::new("t2"));

    // Context lost, principal still bound: restored from the principal.
    let (restored, ctx) = TenantContext::scope(async {
        bind_principal(Principal::new("alice", "t1")).unwrap();
        let pool = f.router.resolve().await.unwrap();
        (pool, TenantContext::get())
    })
    .await;
    assert!(Arc::ptr_eq(&restored, &p1));
    assert_eq!(ctx, Some(TenantId::new("t1")));

    let err = TenantContext::scope_with("ghost", async { f.router.resolve().await.unwrap_err() }).await;
    assert!(matches!(err, TenantError::UnknownTenant(ref t) if t == "ghost"));

    let err = TenantContext::scope_with("t1", async {
        TenantContext::clear();
        f.router.resolve().await.unwrap_err()
    })
    .await;
    assert!(matches!(err, TenantError::NoTenantResolved));

    assert_eq!(f.connector.calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_resolution_builds_one_pool() {
    let f = fixture(&["t1", "t2"]);
    let mut handles = Vec::new();
    for i in 0..50 {
        let router = f.router.clone();
        let tenant = if i % 2 == 0 { "t1" } else { "t2" };
        handles.push(tokio::spawn(TenantContext::scope_with(tenant, async move {
            router.resolve().await.unwrap()
        })));
    }
    let mut pools = Vec::new();
    for h in handles {
        pools.push(h.await.unwrap());
    }

    assert_eq!(f.connector.calls(), 2);
    for (i, pool) in pools.iter().enumerate() {
        let expected = if i % 2 == 0 { &pools[0] } else { &pools[1] };
        assert!(Arc::ptr_eq(pool, expected));
    }
}

#[tokio::test]
async fn newly_registered_tenant_is_picked_up_without_restart() {
    let f = fixture(&["t1"]);
    let id = TenantId::new("late");

    let err = f.router.select_for(&id).await.unwrap_err();
    assert!(matches!(err, TenantError::UnknownTenant(_)));

    f.registry.register(descriptor("late"));
    let pool = f.router.select_for(&id).await.unwrap();
    assert_eq!(pool.tenant_id(), &id);
}

#[tokio::test]
async fn invalidation_rebuilds_from_the_current_descriptor() {
    let f = fixture(&["t1"]);
    let id = TenantId::new("t1");
    let old = f.router.select_for(&id).await.unwrap();

    f.registry.deregister(&id);
    // Still served from the cache until invalidated.
    assert!(Arc::ptr_eq(&old, &f.router.select_for(&id).await.unwrap()));

    assert!(f.router.cache().invalidate(&id));
    let err = f.router.select_for(&id).await.unwrap_err();
    assert!(matches!(err, TenantError::UnknownTenant(_)));
}

#[tokio::test]
async fn select_any_with_no_tenants_fails() {
    let f = fixture(&[]);
    let err = f.router.select_any().await.unwrap_err();
    assert!(matches!(err, TenantError::NoTenantResolved));
}
