//! Process settings read from the environment (optionally seeded from `.env` by the binary).

use crate::config::PoolSettings;
use crate::error::ConfigError;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Settings {
    /// Master database holding the tenant registry.
    pub database_url: String,
    /// Schema of the `master_tenant` table. Must be a valid PostgreSQL identifier.
    pub master_schema: String,
    pub master_pool_max: u32,
    pub tenant_pool: PoolSettings,
    pub bind_addr: String,
    /// Build a pool for every registered tenant at startup.
    pub warm_tenant_pools: bool,
    /// Bearer token for the registry administration routes. Unset disables them.
    pub admin_token: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Missing keys take their defaults; present but unparsable keys fail.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PoolSettings::default();
        let tenant_pool = PoolSettings {
            max_size: parse_or(&lookup, "TENANT_POOL_MAX_SIZE", defaults.max_size)?,
            min_idle: parse_or(&lookup, "TENANT_POOL_MIN_IDLE", defaults.min_idle)?,
            connection_timeout: Duration::from_millis(parse_or(
                &lookup,
                "TENANT_POOL_CONNECTION_TIMEOUT_MS",
                defaults.connection_timeout.as_millis() as u64,
            )?),
            idle_timeout: Duration::from_millis(parse_or(
                &lookup,
                "TENANT_POOL_IDLE_TIMEOUT_MS",
                defaults.idle_timeout.as_millis() as u64,
            )?),
            lazy: parse_or(&lookup, "TENANT_POOL_LAZY", defaults.lazy)?,
        };
        if tenant_pool.max_size == 0 {
            return Err(ConfigError::Validation("TENANT_POOL_MAX_SIZE must be at least 1".into()));
        }
        if tenant_pool.min_idle > tenant_pool.max_size {
            return Err(ConfigError::Validation(format!(
                "TENANT_POOL_MIN_IDLE ({}) exceeds TENANT_POOL_MAX_SIZE ({})",
                tenant_pool.min_idle, tenant_pool.max_size
            )));
        }

        let master_schema = lookup("MASTER_SCHEMA").unwrap_or_else(|| "public".into());
        if !is_identifier(&master_schema) {
            return Err(ConfigError::Invalid {
                key: "MASTER_SCHEMA",
                value: master_schema,
            });
        }

        Ok(Settings {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| "postgres://localhost/master".into()),
            master_schema,
            master_pool_max: parse_or(&lookup, "MASTER_POOL_MAX", 5)?,
            tenant_pool,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".into()),
            warm_tenant_pools: parse_or(&lookup, "WARM_TENANT_POOLS", false)?,
            admin_token: lookup("ADMIN_TOKEN")
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        })
    }

    /// Schema-qualified registry table, e.g. "public.master_tenant".
    pub fn registry_table(&self) -> String {
        format!("{}.master_tenant", self.master_schema)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_match_tenant_pool_defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.tenant_pool, PoolSettings::default());
        assert_eq!(s.tenant_pool.max_size, 20);
        assert_eq!(s.tenant_pool.min_idle, 10);
        assert_eq!(s.tenant_pool.connection_timeout, Duration::from_secs(20));
        assert_eq!(s.registry_table(), "public.master_tenant");
        assert!(!s.warm_tenant_pools);
        assert!(s.admin_token.is_none());
    }

    #[test]
    fn blank_admin_token_counts_as_unset() {
        assert!(settings(&[("ADMIN_TOKEN", "  ")]).unwrap().admin_token.is_none());
        let s = settings(&[("ADMIN_TOKEN", "op-secret")]).unwrap();
        assert_eq!(s.admin_token.as_deref(), Some("op-secret"));
    }

    #[test]
    fn overrides_are_parsed() {
        let s = settings(&[
            ("TENANT_POOL_MAX_SIZE", "8"),
            ("TENANT_POOL_MIN_IDLE", "2"),
            ("TENANT_POOL_IDLE_TIMEOUT_MS", "1000"),
            ("TENANT_POOL_LAZY", "true"),
            ("MASTER_SCHEMA", "mtapp"),
            ("WARM_TENANT_POOLS", "true"),
        ])
        .unwrap();
        assert_eq!(s.tenant_pool.max_size, 8);
        assert_eq!(s.tenant_pool.min_idle, 2);
        assert_eq!(s.tenant_pool.idle_timeout, Duration::from_secs(1));
        assert!(s.tenant_pool.lazy);
        assert!(s.warm_tenant_pools);
        assert_eq!(s.registry_table(), "mtapp.master_tenant");
    }

    #[test]
    fn unparsable_value_names_the_key() {
        let err = settings(&[("TENANT_POOL_MAX_SIZE", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TENANT_POOL_MAX_SIZE", .. }));
    }

    #[test]
    fn min_idle_above_max_size_is_rejected() {
        let err = settings(&[("TENANT_POOL_MAX_SIZE", "4"), ("TENANT_POOL_MIN_IDLE", "5")]).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn schema_must_be_an_identifier() {
        assert!(settings(&[("MASTER_SCHEMA", "x; DROP TABLE y")]).is_err());
    }
}
