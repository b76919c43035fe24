//! Shared application state for all routes.

use crate::auth::SessionStore;
use crate::tenant::{ConnectionRouter, TenantPoolCache};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Master database: tenant registry only, never tenant data.
    pub master_pool: PgPool,
    /// Schema-qualified `master_tenant` table.
    pub registry_table: String,
    pub router: Arc<ConnectionRouter>,
    pub sessions: Arc<SessionStore>,
    /// Operator token for the admin routes; `None` refuses every admin request.
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(master_pool: PgPool, registry_table: impl Into<String>, router: Arc<ConnectionRouter>) -> Self {
        Self {
            master_pool,
            registry_table: registry_table.into(),
            router,
            sessions: Arc::new(SessionStore::new()),
            admin_token: None,
        }
    }

    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token.map(Arc::from);
        self
    }

    pub fn cache(&self) -> &Arc<TenantPoolCache> {
        self.router.cache()
    }
}
