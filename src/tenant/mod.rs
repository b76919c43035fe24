//! Tenant resolution: registry, per-unit-of-work context, pool cache and router.

pub mod cache;
pub mod context;
pub mod descriptor;
pub mod pool;
pub mod registry;
pub mod router;

pub use cache::TenantPoolCache;
pub use context::{bind_principal, current_principal, unbind_principal, TenantContext};
pub use descriptor::{TenantDescriptor, TenantId, TenantSummary};
pub use pool::{PgPoolConnector, PoolConnector, TenantPool};
pub use registry::{PgTenantRegistry, StaticRegistry, TenantRegistry};
pub use router::{BoundPrincipal, ConnectionRouter, PrincipalLookup, TenantPoolSelector};
