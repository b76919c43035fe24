//! Per-unit-of-work tenant context using task-local storage.
//!
//! Every request (or background job) runs inside [`TenantContext::scope`], which
//! gives it its own slot holding the current tenant id and the authenticated
//! principal. Concurrent units of work never see each other's slot, and the
//! slot is dropped with the scope's future, so nothing leaks into the next
//! request served by the same worker thread.
//!
//! ```rust,ignore
//! TenantContext::scope(async {
//!     TenantContext::set("acme")?;
//!     let pool = router.resolve().await?;
//!     // ...
//! }).await
//! ```

use crate::auth::Principal;
use crate::error::TenantError;
use crate::tenant::TenantId;
use std::cell::RefCell;
use std::future::Future;

#[derive(Debug, Default)]
struct UnitOfWork {
    tenant: Option<TenantId>,
    principal: Option<Principal>,
}

tokio::task_local! {
    static UNIT_OF_WORK: RefCell<UnitOfWork>;
}

/// Accessors for the tenant slot of the current unit of work.
pub struct TenantContext;

impl TenantContext {
    /// Run `f` as a new unit of work with an empty context.
    pub async fn scope<F>(f: F) -> F::Output
    where
        F: Future,
    {
        UNIT_OF_WORK.scope(RefCell::new(UnitOfWork::default()), f).await
    }

    /// Run `f` as a new unit of work with the tenant already set.
    pub async fn scope_with<F>(tenant_id: impl Into<TenantId>, f: F) -> F::Output
    where
        F: Future,
    {
        let uow = UnitOfWork {
            tenant: Some(tenant_id.into()),
            principal: None,
        };
        UNIT_OF_WORK.scope(RefCell::new(uow), f).await
    }

    /// Set the current tenant, replacing any previous value.
    pub fn set(tenant_id: impl Into<TenantId>) -> Result<(), TenantError> {
        let tenant_id = tenant_id.into();
        UNIT_OF_WORK
            .try_with(|uow| uow.borrow_mut().tenant = Some(tenant_id))
            .map_err(|_| TenantError::OutsideUnitOfWork)
    }

    /// The current tenant, or `None` when unset or outside a unit of work.
    pub fn get() -> Option<TenantId> {
        UNIT_OF_WORK
            .try_with(|uow| uow.borrow().tenant.clone())
            .ok()
            .flatten()
    }

    pub fn clear() {
        let _ = UNIT_OF_WORK.try_with(|uow| uow.borrow_mut().tenant = None);
    }

    pub fn in_unit_of_work() -> bool {
        UNIT_OF_WORK.try_with(|_| ()).is_ok()
    }
}

/// Attach the authenticated principal to the current unit of work.
pub fn bind_principal(principal: Principal) -> Result<(), TenantError> {
    UNIT_OF_WORK
        .try_with(|uow| uow.borrow_mut().principal = Some(principal))
        .map_err(|_| TenantError::OutsideUnitOfWork)
}

pub fn current_principal() -> Option<Principal> {
    UNIT_OF_WORK
        .try_with(|uow| uow.borrow().principal.clone())
        .ok()
        .flatten()
}

pub fn unbind_principal() {
    let _ = UNIT_OF_WORK.try_with(|uow| uow.borrow_mut().principal = None);
}
