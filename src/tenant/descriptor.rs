//! Tenant identity and connection parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A unique identifier for a tenant. Compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Trimmed, non-empty id or `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl PartialEq<str> for TenantId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TenantId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Connection parameters of one tenant database, as registered in the master table.
///
/// Never mutated in place: a changed registration is a new descriptor, and the
/// cached pool built from the old one must be invalidated.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TenantDescriptor {
    pub tenant_id: TenantId,
    pub connection_url: String,
    pub username: String,
    pub password: String,
}

impl TenantDescriptor {
    pub fn new(
        tenant_id: impl Into<TenantId>,
        connection_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            connection_url: connection_url.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for TenantDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantDescriptor")
            .field("tenant_id", &self.tenant_id)
            .field("connection_url", &self.connection_url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Descriptor as exposed over the admin API: everything but the password.
#[derive(Clone, Debug, Serialize)]
pub struct TenantSummary {
    pub tenant_id: TenantId,
    pub connection_url: String,
    pub username: String,
    pub pool_cached: bool,
    /// When the cached pool was built; `None` when no pool is cached.
    pub pool_created_at: Option<DateTime<Utc>>,
}
