//! Master database plumbing: database bootstrap and the `master_tenant` table.

use crate::error::AppError;
use crate::tenant::{TenantDescriptor, TenantId};
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

/// Create the schema and the `master_tenant` registry table if missing.
/// `schema` must already be validated as an identifier (see `Settings`).
pub async fn ensure_master_tables(pool: &PgPool, schema: &str) -> Result<(), AppError> {
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
        .execute(pool)
        .await?;
    let ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.master_tenant (
            tenant_id TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            username TEXT NOT NULL DEFAULT '',
            password TEXT NOT NULL DEFAULT '',
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        schema
    );
    sqlx::query(&ddl).execute(pool).await?;
    tracing::debug!(schema, "master tables ready");
    Ok(())
}

/// Register or replace a tenant. Returns true when the tenant already existed.
pub async fn upsert_tenant(pool: &PgPool, table: &str, descriptor: &TenantDescriptor) -> Result<bool, AppError> {
    let existed: (bool,) = sqlx::query_as(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE tenant_id = $1)",
        table
    ))
    .bind(descriptor.tenant_id.as_str())
    .fetch_one(pool)
    .await?;
    let sql = format!(
        r#"
        INSERT INTO {} (tenant_id, url, username, password, updated_at)
        VALUES ($1, $2, $3, $4, NOW())
        ON CONFLICT (tenant_id) DO UPDATE
        SET url = EXCLUDED.url, username = EXCLUDED.username, password = EXCLUDED.password, updated_at = NOW()
        "#,
        table
    );
    sqlx::query(&sql)
        .bind(descriptor.tenant_id.as_str())
        .bind(&descriptor.connection_url)
        .bind(&descriptor.username)
        .bind(&descriptor.password)
        .execute(pool)
        .await?;
    Ok(existed.0)
}

/// Remove a tenant. Returns false when it was not registered.
pub async fn delete_tenant(pool: &PgPool, table: &str, tenant_id: &TenantId) -> Result<bool, AppError> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE tenant_id = $1", table))
        .bind(tenant_id.as_str())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Create the database named in `database_url` if it does not exist, connecting
/// through the `postgres` maintenance database of the same server.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %db_name, "created master database");
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))?
        + 1;
    let base = url.get(..path_start).unwrap_or(url);
    if base.ends_with("//") {
        return Ok((url.to_string(), String::new()));
    }
    let path_and_query = url.get(path_start..).unwrap_or("");
    let mut parts = path_and_query.splitn(2, '?');
    let db_name = parts.next().unwrap_or("").trim();
    let query = parts.next().map(|q| format!("?{}", q)).unwrap_or_default();
    Ok((format!("{}postgres{}", base, query), db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_url_points_at_postgres_database() {
        let (admin, db) = parse_db_name_from_url("postgres://u:p@h:5432/master").unwrap();
        assert_eq!(admin, "postgres://u:p@h:5432/postgres");
        assert_eq!(db, "master");
    }

    #[test]
    fn query_string_is_kept_on_admin_url() {
        let (admin, db) = parse_db_name_from_url("postgres://h/master?sslmode=require").unwrap();
        assert_eq!(admin, "postgres://h/postgres?sslmode=require");
        assert_eq!(db, "master");
    }

    #[test]
    fn url_without_database_is_left_alone() {
        assert!(parse_db_name_from_url("master").is_err());
        let (_, db) = parse_db_name_from_url("postgres://localhost:5432").unwrap();
        assert_eq!(db, "");
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("tenant\"db"), "\"tenant\"\"db\"");
    }
}
