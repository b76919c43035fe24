//! Tenant router: per-tenant PostgreSQL pools selected from the current unit of work.
//!
//! A [`ConnectionRouter`] resolves the tenant of the running request (task-local
//! [`TenantContext`], falling back to the authenticated principal) and hands out
//! that tenant's pool from a [`TenantPoolCache`], building it from the
//! [`TenantRegistry`] on first use.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
pub mod tenant;

pub use config::{PoolSettings, Settings};
pub use error::{AppError, ConfigError, TenantError};
pub use response::{success_many, success_many_for, success_one, success_one_ok};
pub use routes::{admin_routes, common_routes, tenant_routes};
pub use state::AppState;
pub use store::{delete_tenant, ensure_database_exists, ensure_master_tables, upsert_tenant};
pub use tenant::{
    ConnectionRouter, PgPoolConnector, PgTenantRegistry, PoolConnector, StaticRegistry, TenantContext,
    TenantDescriptor, TenantId, TenantPool, TenantPoolCache, TenantPoolSelector, TenantRegistry,
};
